//! Oracle and single best solver baselines.
//!
//! Both baselines are computed from recorded performance only, independent of
//! any schedule. The single best solver (SBS) is *chosen* on the training split
//! and *scored* on the test split; choosing it on test data would leak the
//! answer into the reference point.
//!
//! Runtime performance is read through
//! [`ScenarioData::penalized_performance`], so failed runs cost
//! `PAR_FACTOR * cutoff` just like timeouts of the evaluated system.

use crate::error::{Error, Result};
use crate::scenario::ScenarioData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Baseline costs of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceBaseline {
    /// Best cost any algorithm achieves.
    pub oracle: f64,
    /// Cost of the single best solver.
    pub sbs: f64,
}

/// Position of a system between the SBS and the oracle.
///
/// `None` means undefined: oracle and SBS coincide, so there is no gap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GapMetrics {
    pub closed: Option<f64>,
    pub remaining: Option<f64>,
}

impl GapMetrics {
    /// Computes gap metrics from "smaller is better" scores.
    ///
    /// `closed = (sbs - system) / (sbs - oracle)`, `remaining = 1 - closed`.
    /// Scores may be sums or means as long as all three use the same one.
    pub fn from_scores(system: f64, oracle: f64, sbs: f64) -> Self {
        let span = sbs - oracle;
        if span == 0.0 || !span.is_finite() {
            return Self::default();
        }
        let closed = (sbs - system) / span;
        Self {
            closed: Some(closed),
            remaining: Some(1.0 - closed),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.closed.is_some()
    }
}

/// Baselines of one validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    /// Algorithm selected as single best solver on the training split.
    pub sbs: String,
    /// Sum over test instances of the best per-instance cost.
    pub oracle_score: f64,
    /// Sum over test instances of the SBS cost.
    pub sbs_score: f64,
    per_instance: HashMap<String, InstanceBaseline>,
}

impl Baseline {
    pub fn instance(&self, instance: &str) -> Option<InstanceBaseline> {
        self.per_instance.get(instance).copied()
    }

    pub fn gap(&self, system_score: f64) -> GapMetrics {
        GapMetrics::from_scores(system_score, self.oracle_score, self.sbs_score)
    }
}

/// Stateless baseline computations.
pub struct BaselineComputer;

impl BaselineComputer {
    /// Best cost any algorithm achieves on `instance`.
    pub fn oracle_cost<D: ScenarioData + ?Sized>(data: &D, instance: &str) -> Option<f64> {
        data.algorithms()
            .iter()
            .filter_map(|a| data.penalized_performance(a, instance))
            .fold(None, |best: Option<f64>, v| {
                Some(best.map_or(v, |b| b.min(v)))
            })
    }

    /// Sum over all instances of the best per-instance cost.
    pub fn oracle_score<D: ScenarioData + ?Sized>(data: &D) -> f64 {
        data.instances()
            .iter()
            .filter_map(|i| Self::oracle_cost(data, i))
            .sum()
    }

    /// Algorithm with the smallest total cost on `train`.
    ///
    /// Ties go to the algorithm declared first. `None` for an empty scenario.
    pub fn single_best_solver<D: ScenarioData + ?Sized>(train: &D) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;
        for algo in train.algorithms() {
            let total: f64 = train
                .instances()
                .iter()
                .filter_map(|i| train.penalized_performance(algo, i))
                .sum();
            log::debug!("Total cost of {} on training split: {:.4}", algo, total);
            if best.map_or(true, |(_, b)| total < b) {
                best = Some((algo, total));
            }
        }
        best.map(|(algo, _)| algo.clone())
    }

    /// Sum of the cost of `sbs` over all instances of `test`.
    pub fn sbs_score<D: ScenarioData + ?Sized>(test: &D, sbs: &str) -> Option<f64> {
        test.instances()
            .iter()
            .map(|i| test.penalized_performance(sbs, i))
            .sum()
    }

    /// Computes all baselines for a run.
    pub fn compute<T, R>(test: &T, train: &R) -> Result<Baseline>
    where
        T: ScenarioData + ?Sized,
        R: ScenarioData + ?Sized,
    {
        if train.performance_type() != test.performance_type() {
            return Err(Error::InvalidScenario(format!(
                "training split is {} but test split is {}",
                train.performance_type(),
                test.performance_type()
            )));
        }
        if !train.is_normalized() {
            return Err(Error::InvalidScenario(
                "training split performance is not normalized".to_string(),
            ));
        }

        let sbs = Self::single_best_solver(train).ok_or_else(|| {
            Error::InvalidScenario("training split has no algorithms".to_string())
        })?;
        if !test.has_algorithm(&sbs) {
            return Err(Error::InvalidScenario(format!(
                "single best solver '{}' does not occur in the test split",
                sbs
            )));
        }

        let mut per_instance = HashMap::with_capacity(test.instances().len());
        let mut oracle_score = 0.0;
        let mut sbs_score = 0.0;
        for inst in test.instances() {
            if let (Some(oracle), Some(sbs_cost)) = (
                Self::oracle_cost(test, inst),
                test.penalized_performance(&sbs, inst),
            ) {
                oracle_score += oracle;
                sbs_score += sbs_cost;
                per_instance.insert(
                    inst.clone(),
                    InstanceBaseline {
                        oracle,
                        sbs: sbs_cost,
                    },
                );
            }
        }

        log::info!(
            "Single best solver: {} (oracle {:.4}, sbs {:.4} over {} instances)",
            sbs,
            oracle_score,
            sbs_score,
            per_instance.len()
        );

        Ok(Baseline {
            sbs,
            oracle_score,
            sbs_score,
            per_instance,
        })
    }
}
