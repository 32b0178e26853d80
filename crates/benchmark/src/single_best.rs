//! Single best solver schedule generator.
//!
//! Fits the single best solver on a training split and schedules it, alone,
//! on every test instance. Useful as a reference submission.

use aslib_validate_core::{
    BaselineComputer, Error, PerformanceType, Result, ScenarioData, ScheduleEntry, ScheduleSet,
};

/// A fitted single best solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleBest {
    pub algorithm: String,
    pub performance_type: PerformanceType,
    pub cutoff_time: Option<f64>,
}

impl SingleBest {
    /// Picks the algorithm with the smallest total penalized cost on `train`.
    pub fn fit(train: &dyn ScenarioData) -> Result<Self> {
        let algorithm = BaselineComputer::single_best_solver(train).ok_or_else(|| {
            Error::InvalidScenario(format!(
                "training scenario '{}' has no algorithms",
                train.scenario_id()
            ))
        })?;
        log::info!("Single best solver on '{}': {}", train.scenario_id(), algorithm);

        Ok(Self {
            algorithm,
            performance_type: train.performance_type(),
            cutoff_time: train.cutoff_time(),
        })
    }

    /// Schedule for one instance: the SBS with the full cutoff as budget
    /// (runtime), or the SBS alone with no budget (quality).
    pub fn schedule(&self) -> Vec<ScheduleEntry> {
        match (self.performance_type, self.cutoff_time) {
            (PerformanceType::Runtime, Some(cutoff)) => {
                vec![ScheduleEntry::run(self.algorithm.clone(), cutoff)]
            }
            _ => vec![ScheduleEntry::run_unlimited(self.algorithm.clone())],
        }
    }

    /// Schedules for all given test instances.
    pub fn predict(&self, instances: &[String]) -> ScheduleSet {
        instances
            .iter()
            .map(|inst| (inst.clone(), self.schedule()))
            .collect()
    }
}
