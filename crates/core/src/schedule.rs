//! Per-instance execution plans.
//!
//! On the wire a schedule set is a JSON object mapping instance names to
//! entry lists:
//!
//! ```json
//! { "inst1": ["base_step", ["algoA", 4.0], ["algoB", null]] }
//! ```
//!
//! A bare string names a feature step (or, failing that, an algorithm); a
//! two-element array is an algorithm run with a time budget, `null` meaning
//! unlimited. Which of the two a bare string is can only be decided against a
//! scenario, see [`ScheduleEntry::resolve`].

use crate::error::Result;
use crate::scenario::{PerformanceType, ScenarioData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time budget of one algorithm run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Budget {
    Limited(f64),
    Unlimited,
}

impl Budget {
    /// Budget as a number, `f64::INFINITY` when unlimited.
    pub fn as_f64(self) -> f64 {
        match self {
            Budget::Limited(b) => b,
            Budget::Unlimited => f64::INFINITY,
        }
    }

    /// False for negative or NaN budgets, which would rewind the clock.
    pub fn is_valid(self) -> bool {
        match self {
            Budget::Limited(b) => b >= 0.0,
            Budget::Unlimited => true,
        }
    }
}

impl From<Option<f64>> for Budget {
    fn from(value: Option<f64>) -> Self {
        match value {
            None => Budget::Unlimited,
            Some(b) if b == f64::INFINITY => Budget::Unlimited,
            Some(b) => Budget::Limited(b),
        }
    }
}

impl From<Budget> for Option<f64> {
    fn from(budget: Budget) -> Self {
        match budget {
            Budget::Limited(b) => Some(b),
            Budget::Unlimited => None,
        }
    }
}

/// One schedule entry as written by a selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleEntry {
    /// A feature step, or a bare algorithm name.
    Name(String),
    /// An algorithm run with a budget.
    Run(String, Budget),
}

/// A schedule entry interpreted against a concrete scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step<'a> {
    FeatureStepRef(&'a str),
    AlgorithmRun { algorithm: &'a str, budget: Budget },
    /// Runs a known algorithm with a budget that is not a valid time.
    InvalidBudget { algorithm: &'a str, budget: f64 },
    /// Names nothing the scenario knows about.
    Unknown(&'a str),
}

impl ScheduleEntry {
    /// Entry requesting a feature step.
    pub fn feature_step(step: impl Into<String>) -> Self {
        ScheduleEntry::Name(step.into())
    }

    /// Entry running `algorithm` for at most `budget` time units.
    pub fn run(algorithm: impl Into<String>, budget: f64) -> Self {
        ScheduleEntry::Run(algorithm.into(), Budget::from(Some(budget)))
    }

    /// Entry running `algorithm` without a budget.
    pub fn run_unlimited(algorithm: impl Into<String>) -> Self {
        ScheduleEntry::Run(algorithm.into(), Budget::Unlimited)
    }

    /// Name carried by the entry.
    pub fn name(&self) -> &str {
        match self {
            ScheduleEntry::Name(n) | ScheduleEntry::Run(n, _) => n,
        }
    }

    /// Interprets the entry against `data`.
    ///
    /// Feature steps are only recognized in runtime mode; in quality mode a
    /// bare string can only be an algorithm. Budgets only matter, and are
    /// only checked, in runtime mode.
    pub fn resolve<'a, D: ScenarioData + ?Sized>(&'a self, data: &D) -> Step<'a> {
        let runtime = data.performance_type() == PerformanceType::Runtime;
        match self {
            ScheduleEntry::Name(name) if runtime && data.has_feature_step(name) => {
                Step::FeatureStepRef(name)
            }
            ScheduleEntry::Name(name) if data.has_algorithm(name) => Step::AlgorithmRun {
                algorithm: name,
                budget: Budget::Unlimited,
            },
            ScheduleEntry::Run(algorithm, budget)
                if runtime && data.has_algorithm(algorithm) && !budget.is_valid() =>
            {
                Step::InvalidBudget {
                    algorithm,
                    budget: budget.as_f64(),
                }
            }
            ScheduleEntry::Run(algorithm, budget) if data.has_algorithm(algorithm) => {
                Step::AlgorithmRun {
                    algorithm,
                    budget: *budget,
                }
            }
            other => Step::Unknown(other.name()),
        }
    }
}

/// Ordered entries for one instance.
pub type Schedule = Vec<ScheduleEntry>;

/// Schedules for a set of instances, keyed by instance name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleSet {
    schedules: BTreeMap<String, Schedule>,
}

impl ScheduleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the schedule of an instance.
    pub fn insert(&mut self, instance: impl Into<String>, schedule: Schedule) {
        self.schedules.insert(instance.into(), schedule);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, instance: impl Into<String>, schedule: Schedule) -> Self {
        self.insert(instance, schedule);
        self
    }

    pub fn get(&self, instance: &str) -> Option<&Schedule> {
        self.schedules.get(instance)
    }

    pub fn contains(&self, instance: &str) -> bool {
        self.schedules.contains_key(instance)
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Schedule)> {
        self.schedules.iter()
    }

    /// Parses the JSON mapping format.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the JSON mapping format.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FromIterator<(String, Schedule)> for ScheduleSet {
    fn from_iter<T: IntoIterator<Item = (String, Schedule)>>(iter: T) -> Self {
        Self {
            schedules: iter.into_iter().collect(),
        }
    }
}
