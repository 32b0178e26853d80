//! Validation run orchestration.
//!
//! A run walks through fixed phases and never returns to an earlier one:
//!
//! 1. **ModeCheck**: contract checks (mode vs. performance type, normalized
//!    data, every test instance scheduled, single-entry quality schedules) and
//!    baseline preparation. Any failure aborts with no partial report.
//! 2. **Replay**: every test instance is replayed, in parallel shards.
//! 3. **Aggregate**: shard accumulators are merged by a single reducer.
//! 4. **BaselineAttach**: oracle/SBS scores and gap metrics are derived.
//! 5. **Report**: the [`ValidationReport`] is assembled and logged.

use crate::baseline::{Baseline, BaselineComputer, GapMetrics};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::{Error, Result};
use crate::report::{BaselineReport, ValidationReport};
use crate::scenario::{PerformanceType, ScenarioData};
use crate::schedule::ScheduleSet;
use crate::simulator::ScheduleReplaySimulator;
use crate::stats::{Outcome, StatsAccumulator};
use instant::Instant;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration for validation runs.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Drop unsolvable instances that timed out from the runtime averages.
    pub remove_unsolvable: bool,
    /// Replay shards on the rayon pool.
    pub parallel: bool,
    /// Worker threads (0 = rayon default).
    pub threads: usize,
    /// Instances per replay shard.
    pub shard_size: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            remove_unsolvable: true,
            parallel: true,
            threads: 0,
            shard_size: 64,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remove_unsolvable(mut self, remove: bool) -> Self {
        self.remove_unsolvable = remove;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the shard size (at least 1).
    pub fn with_shard_size(mut self, shard_size: usize) -> Self {
        self.shard_size = shard_size.max(1);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ModeCheck,
    Replay,
    Aggregate,
    BaselineAttach,
    Report,
}

/// Everything one replay shard produces.
struct Shard {
    stats: StatsAccumulator,
    outcomes: Vec<Outcome>,
    diagnostics: Vec<Diagnostic>,
    skipped: usize,
}

/// Validates schedules against a test split.
pub struct Validator {
    config: ValidatorConfig,
    cancelled: Arc<AtomicBool>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Returns a handle that stops scheduling further instances when set.
    ///
    /// Instances already being replayed finish; the report is flagged
    /// `cancelled` and covers only what was replayed.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Validates runtime schedules.
    pub fn validate_runtime(
        &self,
        schedules: &ScheduleSet,
        test: &dyn ScenarioData,
        train: Option<&dyn ScenarioData>,
    ) -> Result<ValidationReport> {
        self.validate(PerformanceType::Runtime, schedules, test, train)
    }

    /// Validates solution-quality selections.
    pub fn validate_quality(
        &self,
        schedules: &ScheduleSet,
        test: &dyn ScenarioData,
        train: Option<&dyn ScenarioData>,
    ) -> Result<ValidationReport> {
        self.validate(PerformanceType::SolutionQuality, schedules, test, train)
    }

    /// Runs a full validation.
    ///
    /// Baselines and gap metrics are only computed when `train` is given.
    pub fn validate(
        &self,
        mode: PerformanceType,
        schedules: &ScheduleSet,
        test: &dyn ScenarioData,
        train: Option<&dyn ScenarioData>,
    ) -> Result<ValidationReport> {
        let start = Instant::now();
        let mut phase = Phase::ModeCheck;
        log::debug!("Validation of '{}': {:?}", test.scenario_id(), phase);

        Self::check_contract(mode, schedules, test)?;
        let baseline = match train {
            Some(train) => Some(BaselineComputer::compute(test, train)?),
            None => None,
        };
        let mut diagnostics = Self::extra_schedules(schedules, test);

        advance(&mut phase, Phase::Replay);
        let cutoff = match mode {
            PerformanceType::Runtime => test.cutoff_time(),
            PerformanceType::SolutionQuality => None,
        };
        let shards = self.replay_all(mode, schedules, test, baseline.as_ref(), cutoff)?;

        advance(&mut phase, Phase::Aggregate);
        let mut stats = StatsAccumulator::new(cutoff);
        let mut outcomes = Vec::with_capacity(test.instances().len());
        let mut skipped = 0;
        for shard in shards {
            stats.merge(&shard.stats)?;
            outcomes.extend(shard.outcomes);
            diagnostics.extend(shard.diagnostics);
            skipped += shard.skipped;
        }

        advance(&mut phase, Phase::BaselineAttach);
        let baseline_report = baseline.map(|b| {
            let totals = stats.baseline_totals(self.config.remove_unsolvable);
            let gap =
                GapMetrics::from_scores(totals.system_sum, totals.oracle_sum, totals.sbs_sum);
            if !gap.is_defined() {
                diagnostics.push(Diagnostic::run_warning(
                    DiagnosticKind::DegenerateBaseline,
                    format!(
                        "oracle and single best solver '{}' score the same, gap is undefined",
                        b.sbs
                    ),
                ));
            }
            let mean = |sum: f64| {
                if totals.count == 0 {
                    0.0
                } else {
                    test.to_native(totals.mean(sum))
                }
            };
            BaselineReport {
                sbs: b.sbs,
                oracle_score: mean(totals.oracle_sum),
                sbs_score: mean(totals.sbs_sum),
                gap_closed: gap.closed,
                gap_remaining: gap.remaining,
                worse_than_sbs: totals.worse_than_sbs,
            }
        });

        advance(&mut phase, Phase::Report);
        for d in &diagnostics {
            d.log();
        }
        if skipped > 0 {
            log::warn!(
                "Validation cancelled, {} instance(s) were not replayed",
                skipped
            );
        }

        let summary = stats.summarize(self.config.remove_unsolvable);
        let report = ValidationReport {
            scenario: test.scenario_id().to_string(),
            mode,
            maximize: test.maximize(),
            cutoff_time: cutoff,
            score: match mode {
                PerformanceType::Runtime => summary.par10.unwrap_or(summary.par1),
                PerformanceType::SolutionQuality => test.to_native(summary.par1),
            },
            summary,
            baseline: baseline_report,
            diagnostics,
            outcomes,
            cancelled: skipped > 0,
            skipped_instances: skipped,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        report.log_summary();
        Ok(report)
    }

    fn check_contract(
        mode: PerformanceType,
        schedules: &ScheduleSet,
        test: &dyn ScenarioData,
    ) -> Result<()> {
        if test.performance_type() != mode {
            return Err(Error::ModeMismatch {
                requested: mode,
                scenario: test.performance_type(),
            });
        }
        if test.maximize() && !test.is_normalized() {
            return Err(Error::InvalidScenario(format!(
                "performance of maximized scenario '{}' has not been normalized",
                test.scenario_id()
            )));
        }

        let missing: Vec<String> = test
            .instances()
            .iter()
            .filter(|i| !schedules.contains(i))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingSchedules(missing));
        }

        if mode == PerformanceType::SolutionQuality {
            for inst in test.instances() {
                let entries = schedules.get(inst).map_or(0, Vec::len);
                if entries > 1 {
                    return Err(Error::MultiEntryQualitySchedule {
                        instance: inst.clone(),
                        entries,
                    });
                }
            }
        }
        Ok(())
    }

    fn extra_schedules(schedules: &ScheduleSet, test: &dyn ScenarioData) -> Vec<Diagnostic> {
        let known: std::collections::HashSet<&str> =
            test.instances().iter().map(String::as_str).collect();
        schedules
            .iter()
            .filter(|(inst, _)| !known.contains(inst.as_str()))
            .map(|(inst, _)| {
                Diagnostic::warning(
                    DiagnosticKind::ExtraSchedule,
                    inst,
                    "instance is not part of the test split, schedule ignored",
                )
            })
            .collect()
    }

    fn replay_all(
        &self,
        mode: PerformanceType,
        schedules: &ScheduleSet,
        test: &dyn ScenarioData,
        baseline: Option<&Baseline>,
        cutoff: Option<f64>,
    ) -> Result<Vec<Shard>> {
        let instances = test.instances();
        let shard_size = self.config.shard_size.max(1);
        let run_shard =
            |chunk: &[String]| self.replay_shard(chunk, mode, schedules, test, baseline, cutoff);

        if !self.config.parallel {
            return instances.chunks(shard_size).map(run_shard).collect();
        }
        if self.config.threads == 0 {
            return instances.par_chunks(shard_size).map(run_shard).collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()?;
        pool.install(|| instances.par_chunks(shard_size).map(run_shard).collect())
    }

    fn replay_shard(
        &self,
        chunk: &[String],
        mode: PerformanceType,
        schedules: &ScheduleSet,
        test: &dyn ScenarioData,
        baseline: Option<&Baseline>,
        cutoff: Option<f64>,
    ) -> Result<Shard> {
        let mut shard = Shard {
            stats: StatsAccumulator::new(cutoff),
            outcomes: Vec::with_capacity(chunk.len()),
            diagnostics: Vec::new(),
            skipped: 0,
        };

        for inst in chunk {
            if self.cancelled.load(Ordering::Relaxed) {
                shard.skipped += 1;
                continue;
            }
            let schedule = schedules.get(inst).map(Vec::as_slice).unwrap_or(&[]);
            let mut replay = ScheduleReplaySimulator::replay(schedule, inst, mode, test)?;
            if replay.outcome.solved || cutoff.is_some() {
                replay.outcome.baseline = baseline.and_then(|b| b.instance(inst));
            }
            shard.stats.fold(&replay.outcome);
            shard.outcomes.push(replay.outcome);
            shard.diagnostics.extend(replay.diagnostics);
        }
        Ok(shard)
    }
}

fn advance(phase: &mut Phase, next: Phase) {
    log::debug!("Validation phase {:?} -> {:?}", phase, next);
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{RunStatus, ScenarioBuilder, ScenarioTables};
    use crate::schedule::ScheduleEntry;
    use approx::assert_relative_eq;

    fn scenario() -> ScenarioTables {
        ScenarioBuilder::runtime("unit", 10.0)
            .run("a", "i1", 2.0, RunStatus::Ok)
            .run("b", "i1", 5.0, RunStatus::Ok)
            .run("a", "i2", 20.0, RunStatus::Timeout)
            .run("b", "i2", 4.0, RunStatus::Ok)
            .build()
            .unwrap()
    }

    fn always_a() -> ScheduleSet {
        ScheduleSet::new()
            .with("i1", vec![ScheduleEntry::run("a", 10.0)])
            .with("i2", vec![ScheduleEntry::run("a", 10.0)])
    }

    #[test]
    fn test_validator_config_defaults() {
        let config = ValidatorConfig::default();
        assert!(config.remove_unsolvable);
        assert!(config.parallel);
        assert_eq!(config.with_shard_size(0).shard_size, 1);
    }

    #[test]
    fn test_runtime_run_without_baseline() {
        let data = scenario();
        let report = Validator::default()
            .validate_runtime(&always_a(), &data, None)
            .unwrap();

        assert_eq!(report.summary.solved, 1);
        assert_eq!(report.summary.timeouts, 1);
        assert_relative_eq!(report.summary.par1, 6.0);
        assert_relative_eq!(report.score, 51.0);
        assert!(report.baseline.is_none());
        assert!(!report.cancelled);
    }

    #[test]
    fn test_mode_mismatch_is_fatal() {
        let data = scenario();
        let err = Validator::default()
            .validate_quality(&always_a(), &data, None)
            .unwrap_err();
        assert!(matches!(err, Error::ModeMismatch { .. }));
    }

    #[test]
    fn test_missing_schedule_is_fatal() {
        let data = scenario();
        let partial = ScheduleSet::new().with("i1", vec![ScheduleEntry::run("a", 10.0)]);
        let err = Validator::default()
            .validate_runtime(&partial, &data, None)
            .unwrap_err();
        match err {
            Error::MissingSchedules(missing) => assert_eq!(missing, vec!["i2".to_string()]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_run_is_flagged() {
        let data = scenario();
        let validator = Validator::new(ValidatorConfig::new().with_parallel(false));
        validator.cancel_handle().store(true, Ordering::Relaxed);

        let report = validator.validate_runtime(&always_a(), &data, None).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.skipped_instances, 2);
        assert_eq!(report.summary.instances, 0);
    }

    #[test]
    fn test_dedicated_thread_pool() {
        let data = scenario();
        let validator = Validator::new(
            ValidatorConfig::new()
                .with_threads(2)
                .with_shard_size(1),
        );
        let report = validator.validate_runtime(&always_a(), &data, None).unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].instance, "i1");
    }
}
