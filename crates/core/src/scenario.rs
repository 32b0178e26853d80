//! Read-only access to benchmark scenario data.
//!
//! The validator never touches files. It consumes one data split (train or
//! test) through the [`ScenarioData`] trait; [`ScenarioTables`] is the
//! in-memory implementation produced by loaders and test fixtures.

use crate::error::{Error, Result};
use crate::stats::PAR_FACTOR;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// What the recorded performance values measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceType {
    /// Wall-clock running time, bounded by a cutoff.
    Runtime,
    /// Solution quality of the final answer.
    SolutionQuality,
}

impl fmt::Display for PerformanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceType::Runtime => write!(f, "runtime"),
            PerformanceType::SolutionQuality => write!(f, "solution_quality"),
        }
    }
}

impl FromStr for PerformanceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "runtime" => Ok(PerformanceType::Runtime),
            "solution_quality" | "quality" => Ok(PerformanceType::SolutionQuality),
            other => Err(Error::InvalidScenario(format!(
                "unknown performance type '{}'",
                other
            ))),
        }
    }
}

/// Recorded outcome of one algorithm run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Timeout,
    Memout,
    NotApplicable,
    Crash,
    Other,
}

impl FromStr for RunStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "ok" => RunStatus::Ok,
            "timeout" => RunStatus::Timeout,
            "memout" => RunStatus::Memout,
            "not_applicable" => RunStatus::NotApplicable,
            "crash" => RunStatus::Crash,
            _ => RunStatus::Other,
        })
    }
}

/// Recorded outcome of computing one feature step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    Ok,
    /// The feature computation solved the instance outright.
    Presolved,
    Timeout,
    Memout,
    Crash,
    Unknown,
    Other,
}

impl FromStr for FeatureStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "ok" => FeatureStatus::Ok,
            "presolved" => FeatureStatus::Presolved,
            "timeout" => FeatureStatus::Timeout,
            "memout" => FeatureStatus::Memout,
            "crash" => FeatureStatus::Crash,
            "unknown" => FeatureStatus::Unknown,
            _ => FeatureStatus::Other,
        })
    }
}

/// Read-only view of one data split.
///
/// Performance values handed out by an implementation must already be
/// "smaller is better" (see [`ScenarioData::is_normalized`]); the validator
/// never flips signs itself.
pub trait ScenarioData: Sync {
    /// Scenario identifier, used in reports.
    fn scenario_id(&self) -> &str;

    fn performance_type(&self) -> PerformanceType;

    /// Whether the native performance measure is maximized.
    fn maximize(&self) -> bool;

    /// Whether performance values are in "smaller is better" form.
    fn is_normalized(&self) -> bool;

    /// Algorithm cutoff, present iff the performance type is runtime.
    fn cutoff_time(&self) -> Option<f64>;

    fn instances(&self) -> &[String];

    fn algorithms(&self) -> &[String];

    fn feature_steps(&self) -> &[String];

    fn performance(&self, algorithm: &str, instance: &str) -> Option<f64>;

    /// Run status; `None` for solution-quality scenarios.
    fn run_status(&self, algorithm: &str, instance: &str) -> Option<&RunStatus>;

    /// Feature computation cost; `None` when no cost data was recorded.
    fn feature_cost(&self, step: &str, instance: &str) -> Option<f64>;

    fn feature_status(&self, step: &str, instance: &str) -> Option<&FeatureStatus>;

    /// Feature steps that must run before `step`.
    fn feature_requires(&self, step: &str) -> &[String];

    fn has_algorithm(&self, algorithm: &str) -> bool {
        self.algorithms().iter().any(|a| a == algorithm)
    }

    fn has_feature_step(&self, step: &str) -> bool {
        self.feature_steps().iter().any(|s| s == step)
    }

    /// Performance with failed or over-cutoff runtime runs charged at
    /// `PAR_FACTOR * cutoff`, so that baselines share the PAR10 scale.
    fn penalized_performance(&self, algorithm: &str, instance: &str) -> Option<f64> {
        let perf = self.performance(algorithm, instance)?;
        match (self.performance_type(), self.cutoff_time()) {
            (PerformanceType::Runtime, Some(cutoff)) => {
                let ok = matches!(self.run_status(algorithm, instance), Some(RunStatus::Ok));
                if ok && perf <= cutoff {
                    Some(perf)
                } else {
                    Some(PAR_FACTOR * cutoff)
                }
            }
            _ => Some(perf),
        }
    }

    /// True iff no algorithm finished with status `ok` on the instance.
    ///
    /// Always false for solution-quality scenarios, which carry no run status.
    fn is_unsolvable(&self, instance: &str) -> bool {
        if self.performance_type() != PerformanceType::Runtime {
            return false;
        }
        !self
            .algorithms()
            .iter()
            .any(|a| matches!(self.run_status(a, instance), Some(RunStatus::Ok)))
    }

    /// Converts an internal (normalized) value back to native units.
    fn to_native(&self, value: f64) -> f64 {
        if self.maximize() && self.is_normalized() {
            -value
        } else {
            value
        }
    }
}

/// Immutable, fully materialized scenario tables.
///
/// Construct through [`ScenarioBuilder`]. Tables are indexed
/// `[entity][instance]`.
#[derive(Debug, Clone)]
pub struct ScenarioTables {
    id: String,
    performance_type: PerformanceType,
    maximize: bool,
    normalized: bool,
    cutoff_time: Option<f64>,
    instances: Vec<String>,
    algorithms: Vec<String>,
    feature_steps: Vec<String>,
    instance_index: HashMap<String, usize>,
    algorithm_index: HashMap<String, usize>,
    step_index: HashMap<String, usize>,
    performance: Vec<Vec<f64>>,
    run_status: Option<Vec<Vec<RunStatus>>>,
    feature_cost: Option<Vec<Vec<f64>>>,
    feature_status: Option<Vec<Vec<FeatureStatus>>>,
    requires: Vec<Vec<String>>,
}

impl ScenarioTables {
    /// Returns the tables in "smaller is better" form.
    ///
    /// Negates performance once for maximize scenarios. Calling it on tables
    /// that are already normalized returns them unchanged.
    pub fn normalized(mut self) -> Self {
        if self.normalized {
            return self;
        }
        if self.maximize {
            log::debug!(
                "Negating performance of '{}' because it is maximized",
                self.id
            );
            for row in &mut self.performance {
                for v in row.iter_mut() {
                    *v = -*v;
                }
            }
        }
        self.normalized = true;
        self
    }

    /// Returns a copy restricted to the given instances, in the given order.
    ///
    /// Unknown names are skipped.
    pub fn subset(&self, instances: &[String]) -> Self {
        let keep: Vec<usize> = instances
            .iter()
            .filter_map(|i| self.instance_index.get(i).copied())
            .collect();
        let pick_f64 = |rows: &Vec<Vec<f64>>| -> Vec<Vec<f64>> {
            rows.iter()
                .map(|row| keep.iter().map(|&i| row[i]).collect())
                .collect()
        };
        let names: Vec<String> = keep.iter().map(|&i| self.instances[i].clone()).collect();

        Self {
            instance_index: index_of(&names),
            instances: names,
            performance: pick_f64(&self.performance),
            run_status: self.run_status.as_ref().map(|rows| {
                rows.iter()
                    .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                    .collect()
            }),
            feature_cost: self.feature_cost.as_ref().map(pick_f64),
            feature_status: self.feature_status.as_ref().map(|rows| {
                rows.iter()
                    .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                    .collect()
            }),
            ..self.clone()
        }
    }

    fn cell<'a, T>(
        &self,
        table: &'a [Vec<T>],
        index: &HashMap<String, usize>,
        entity: &str,
        instance: &str,
    ) -> Option<&'a T> {
        let e = *index.get(entity)?;
        let i = *self.instance_index.get(instance)?;
        table.get(e).and_then(|row| row.get(i))
    }
}

impl ScenarioData for ScenarioTables {
    fn scenario_id(&self) -> &str {
        &self.id
    }

    fn performance_type(&self) -> PerformanceType {
        self.performance_type
    }

    fn maximize(&self) -> bool {
        self.maximize
    }

    fn is_normalized(&self) -> bool {
        self.normalized
    }

    fn cutoff_time(&self) -> Option<f64> {
        self.cutoff_time
    }

    fn instances(&self) -> &[String] {
        &self.instances
    }

    fn algorithms(&self) -> &[String] {
        &self.algorithms
    }

    fn feature_steps(&self) -> &[String] {
        &self.feature_steps
    }

    fn performance(&self, algorithm: &str, instance: &str) -> Option<f64> {
        self.cell(&self.performance, &self.algorithm_index, algorithm, instance)
            .copied()
    }

    fn run_status(&self, algorithm: &str, instance: &str) -> Option<&RunStatus> {
        let table = self.run_status.as_ref()?;
        self.cell(table, &self.algorithm_index, algorithm, instance)
    }

    fn feature_cost(&self, step: &str, instance: &str) -> Option<f64> {
        let table = self.feature_cost.as_ref()?;
        self.cell(table, &self.step_index, step, instance).copied()
    }

    fn feature_status(&self, step: &str, instance: &str) -> Option<&FeatureStatus> {
        let table = self.feature_status.as_ref()?;
        self.cell(table, &self.step_index, step, instance)
    }

    fn feature_requires(&self, step: &str) -> &[String] {
        self.step_index
            .get(step)
            .map(|&s| self.requires[s].as_slice())
            .unwrap_or(&[])
    }

    fn has_algorithm(&self, algorithm: &str) -> bool {
        self.algorithm_index.contains_key(algorithm)
    }

    fn has_feature_step(&self, step: &str) -> bool {
        self.step_index.contains_key(step)
    }
}

/// Builder for [`ScenarioTables`].
///
/// Entities are registered in first-seen order, which fixes tie-breaking
/// everywhere downstream.
///
/// ```rust
/// use aslib_validate_core::{RunStatus, ScenarioBuilder, ScenarioData};
///
/// let scenario = ScenarioBuilder::runtime("toy", 10.0)
///     .run("algoA", "inst1", 6.0, RunStatus::Ok)
///     .run("algoB", "inst1", 3.0, RunStatus::Ok)
///     .build()
///     .unwrap();
///
/// assert_eq!(scenario.algorithms().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    id: String,
    performance_type: PerformanceType,
    maximize: bool,
    cutoff_time: Option<f64>,
    instances: Vec<String>,
    algorithms: Vec<String>,
    feature_steps: Vec<String>,
    requires: HashMap<String, Vec<String>>,
    performance: HashMap<(String, String), f64>,
    run_status: HashMap<(String, String), RunStatus>,
    features: HashMap<(String, String), (Option<f64>, FeatureStatus)>,
}

impl ScenarioBuilder {
    fn new(id: &str, performance_type: PerformanceType) -> Self {
        Self {
            id: id.to_string(),
            performance_type,
            maximize: false,
            cutoff_time: None,
            instances: Vec::new(),
            algorithms: Vec::new(),
            feature_steps: Vec::new(),
            requires: HashMap::new(),
            performance: HashMap::new(),
            run_status: HashMap::new(),
            features: HashMap::new(),
        }
    }

    /// Starts a runtime scenario with the given cutoff.
    pub fn runtime(id: &str, cutoff_time: f64) -> Self {
        let mut builder = Self::new(id, PerformanceType::Runtime);
        builder.cutoff_time = Some(cutoff_time);
        builder
    }

    /// Starts a solution-quality scenario.
    pub fn quality(id: &str, maximize: bool) -> Self {
        let mut builder = Self::new(id, PerformanceType::SolutionQuality);
        builder.maximize = maximize;
        builder
    }

    /// Instances declared so far, in insertion order.
    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    /// Declares an instance (no-op if already known).
    pub fn instance(mut self, name: &str) -> Self {
        push_unique(&mut self.instances, name);
        self
    }

    /// Declares an algorithm (no-op if already known).
    pub fn algorithm(mut self, name: &str) -> Self {
        push_unique(&mut self.algorithms, name);
        self
    }

    /// Declares a feature step with its prerequisites.
    pub fn feature_step(mut self, name: &str, requires: &[&str]) -> Self {
        push_unique(&mut self.feature_steps, name);
        self.requires.insert(
            name.to_string(),
            requires.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    /// Records a performance value (solution-quality scenarios).
    pub fn performance(mut self, algorithm: &str, instance: &str, value: f64) -> Self {
        push_unique(&mut self.algorithms, algorithm);
        push_unique(&mut self.instances, instance);
        self.performance
            .insert((algorithm.to_string(), instance.to_string()), value);
        self
    }

    /// Records a runtime together with its run status.
    pub fn run(mut self, algorithm: &str, instance: &str, time: f64, status: RunStatus) -> Self {
        self = self.performance(algorithm, instance, time);
        self.run_status
            .insert((algorithm.to_string(), instance.to_string()), status);
        self
    }

    /// Records the cost and status of a feature step on an instance.
    ///
    /// A `None` cost means the scenario records no cost for this cell; it is
    /// treated as free.
    pub fn feature(
        mut self,
        step: &str,
        instance: &str,
        cost: Option<f64>,
        status: FeatureStatus,
    ) -> Self {
        if !self.feature_steps.iter().any(|s| s == step) {
            self = self.feature_step(step, &[]);
        }
        push_unique(&mut self.instances, instance);
        self.features
            .insert((step.to_string(), instance.to_string()), (cost, status));
        self
    }

    /// Validates completeness and produces the tables.
    ///
    /// Minimization scenarios come out normalized; maximization scenarios
    /// must still be passed through [`ScenarioTables::normalized`].
    pub fn build(self) -> Result<ScenarioTables> {
        let runtime = self.performance_type == PerformanceType::Runtime;
        match self.cutoff_time {
            Some(c) if !runtime => {
                return Err(Error::InvalidScenario(format!(
                    "cutoff {} given for a solution quality scenario",
                    c
                )))
            }
            None if runtime => {
                return Err(Error::InvalidScenario(
                    "runtime scenario without cutoff time".to_string(),
                ))
            }
            Some(c) if !(c.is_finite() && c > 0.0) => {
                return Err(Error::InvalidScenario(format!("invalid cutoff {}", c)))
            }
            _ => {}
        }

        for (step, reqs) in &self.requires {
            if let Some(missing) = reqs.iter().find(|r| !self.feature_steps.contains(r)) {
                return Err(Error::InvalidScenario(format!(
                    "feature step '{}' requires undeclared step '{}'",
                    step, missing
                )));
            }
        }

        let key = |e: &str, i: &str| (e.to_string(), i.to_string());

        let mut performance = Vec::with_capacity(self.algorithms.len());
        for algo in &self.algorithms {
            let mut row = Vec::with_capacity(self.instances.len());
            for inst in &self.instances {
                let v = self.performance.get(&key(algo, inst)).ok_or_else(|| {
                    Error::InvalidScenario(format!("no performance for {} on {}", algo, inst))
                })?;
                row.push(*v);
            }
            performance.push(row);
        }

        let run_status = if runtime {
            let mut table = Vec::with_capacity(self.algorithms.len());
            for algo in &self.algorithms {
                let mut row = Vec::with_capacity(self.instances.len());
                for inst in &self.instances {
                    let s = self.run_status.get(&key(algo, inst)).ok_or_else(|| {
                        Error::InvalidScenario(format!("no run status for {} on {}", algo, inst))
                    })?;
                    row.push(s.clone());
                }
                table.push(row);
            }
            Some(table)
        } else {
            None
        };

        let (feature_cost, feature_status) = if runtime && !self.feature_steps.is_empty() {
            let mut costs = Vec::with_capacity(self.feature_steps.len());
            let mut statuses = Vec::with_capacity(self.feature_steps.len());
            let mut any_cost = false;
            for step in &self.feature_steps {
                let mut cost_row = Vec::with_capacity(self.instances.len());
                let mut status_row = Vec::with_capacity(self.instances.len());
                for inst in &self.instances {
                    let (cost, status) = self.features.get(&key(step, inst)).ok_or_else(|| {
                        Error::InvalidScenario(format!(
                            "no feature data for step {} on {}",
                            step, inst
                        ))
                    })?;
                    any_cost |= cost.is_some();
                    cost_row.push(cost.unwrap_or(0.0));
                    status_row.push(status.clone());
                }
                costs.push(cost_row);
                statuses.push(status_row);
            }
            (any_cost.then_some(costs), Some(statuses))
        } else {
            (None, None)
        };

        let requires = self
            .feature_steps
            .iter()
            .map(|s| self.requires.get(s).cloned().unwrap_or_default())
            .collect();

        Ok(ScenarioTables {
            id: self.id,
            performance_type: self.performance_type,
            maximize: self.maximize,
            normalized: !self.maximize,
            cutoff_time: self.cutoff_time,
            instance_index: index_of(&self.instances),
            algorithm_index: index_of(&self.algorithms),
            step_index: index_of(&self.feature_steps),
            instances: self.instances,
            algorithms: self.algorithms,
            feature_steps: self.feature_steps,
            performance,
            run_status,
            feature_cost,
            feature_status,
            requires,
        })
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

fn index_of(names: &[String]) -> HashMap<String, usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect()
}
