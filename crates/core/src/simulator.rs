//! Schedule replay against recorded performance data.
//!
//! ## Runtime mode
//!
//! Entries run in order while a clock accumulates:
//!
//! - a feature step adds its recorded cost and solves the instance if its
//!   status is `presolved`;
//! - an algorithm run adds `min(runtime, budget)` and solves the instance if
//!   `runtime <= budget` and the run status is `ok`.
//!
//! After every entry the replay stops with success if the instance is solved
//! within the cutoff, or with a timeout (elapsed clamped to the cutoff) once
//! the clock reaches the cutoff. A schedule that runs out of entries without
//! either happening counts as a timeout as well.
//!
//! ## Quality mode
//!
//! A schedule holds a single entry naming the selected algorithm (a budget, if
//! any, is ignored). Its recorded quality is the outcome.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::{Error, Result};
use crate::scenario::{FeatureStatus, PerformanceType, RunStatus, ScenarioData};
use crate::schedule::{ScheduleEntry, Step};
use crate::stats::Outcome;

/// Outcome of one replay together with the diagnostics it raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    pub outcome: Outcome,
    pub diagnostics: Vec<Diagnostic>,
}

/// Replays schedules of single instances. Stateless; safe to share across threads.
pub struct ScheduleReplaySimulator;

impl ScheduleReplaySimulator {
    /// Replays `schedule` on `instance`.
    ///
    /// Fails only on contract violations: a quality schedule with more than
    /// one entry, or a runtime replay on data without a cutoff.
    pub fn replay<D: ScenarioData + ?Sized>(
        schedule: &[ScheduleEntry],
        instance: &str,
        mode: PerformanceType,
        data: &D,
    ) -> Result<Replay> {
        match mode {
            PerformanceType::Runtime => {
                let cutoff = data.cutoff_time().ok_or_else(|| {
                    Error::InvalidScenario("runtime replay needs a cutoff time".to_string())
                })?;
                Ok(Self::replay_runtime(schedule, instance, cutoff, data))
            }
            PerformanceType::SolutionQuality => Self::replay_quality(schedule, instance, data),
        }
    }

    fn replay_runtime<D: ScenarioData + ?Sized>(
        schedule: &[ScheduleEntry],
        instance: &str,
        cutoff: f64,
        data: &D,
    ) -> Replay {
        let mut outcome = Outcome::new(instance, cutoff, false);
        outcome.unsolvable = data.is_unsolvable(instance);
        let mut diagnostics = Vec::new();
        let mut solved_steps: Vec<&str> = Vec::new();
        let mut elapsed = 0.0;

        log::debug!("Validate: {:?} on {}", schedule, instance);

        for entry in schedule {
            let (solved, by_feature) = match entry.resolve(data) {
                Step::FeatureStepRef(step) => {
                    let missing: Vec<&str> = data
                        .feature_requires(step)
                        .iter()
                        .map(String::as_str)
                        .filter(|r| !solved_steps.contains(r))
                        .collect();
                    if !missing.is_empty() {
                        diagnostics.push(Diagnostic::warning(
                            DiagnosticKind::DataInconsistency,
                            instance,
                            format!(
                                "feature step '{}' ran before its prerequisites {:?}",
                                step, missing
                            ),
                        ));
                    }

                    let cost = data.feature_cost(step, instance).unwrap_or(0.0);
                    log::debug!("Used feature time {:.4} for {}", cost, step);
                    elapsed += cost;
                    solved_steps.push(step);

                    let presolved = matches!(
                        data.feature_status(step, instance),
                        Some(FeatureStatus::Presolved)
                    );
                    (presolved, true)
                }
                Step::AlgorithmRun { algorithm, budget } => {
                    let Some(time) = data.performance(algorithm, instance) else {
                        diagnostics.push(Diagnostic::warning(
                            DiagnosticKind::UnknownEntry,
                            instance,
                            format!("no performance recorded for '{}'", algorithm),
                        ));
                        continue;
                    };
                    outcome.note_algorithm(algorithm);

                    let budget = budget.as_f64();
                    log::debug!(
                        "Allotted time {} of {} vs true time {:.4}",
                        budget,
                        algorithm,
                        time
                    );
                    elapsed += time.min(budget);
                    let ok = matches!(data.run_status(algorithm, instance), Some(RunStatus::Ok));
                    (time <= budget && ok, false)
                }
                Step::InvalidBudget { algorithm, budget } => {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::InvalidBudget,
                        instance,
                        format!("run of '{}' skipped, budget {} is invalid", algorithm, budget),
                    ));
                    continue;
                }
                Step::Unknown(name) => {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::UnknownEntry,
                        instance,
                        format!("'{}' is neither an algorithm nor a feature step", name),
                    ));
                    continue;
                }
            };
            log::debug!("Used time (so far): {:.4}", elapsed);

            if solved && elapsed <= cutoff {
                log::debug!("Solved {} after {:.4}", instance, elapsed);
                outcome.elapsed = elapsed;
                outcome.solved = true;
                outcome.presolved = by_feature;
                return Replay {
                    outcome,
                    diagnostics,
                };
            }
            if elapsed >= cutoff {
                log::debug!(
                    "Timeout on {} after {:.4} (cutoff {})",
                    instance,
                    elapsed,
                    cutoff
                );
                return Replay {
                    outcome,
                    diagnostics,
                };
            }
        }

        log::debug!(
            "Schedule of {} exhausted after {:.4} without success, counted as timeout",
            instance,
            elapsed
        );
        Replay {
            outcome,
            diagnostics,
        }
    }

    fn replay_quality<D: ScenarioData + ?Sized>(
        schedule: &[ScheduleEntry],
        instance: &str,
        data: &D,
    ) -> Result<Replay> {
        if schedule.len() > 1 {
            return Err(Error::MultiEntryQualitySchedule {
                instance: instance.to_string(),
                entries: schedule.len(),
            });
        }

        let mut diagnostics = Vec::new();
        for entry in schedule {
            match entry.resolve(data) {
                Step::AlgorithmRun { algorithm, .. } => {
                    if let Some(quality) = data.performance(algorithm, instance) {
                        log::debug!(
                            "Using {} on {} with performance {:.4}",
                            algorithm,
                            instance,
                            quality
                        );
                        let mut outcome = Outcome::new(instance, quality, true);
                        outcome.note_algorithm(algorithm);
                        return Ok(Replay {
                            outcome,
                            diagnostics,
                        });
                    }
                }
                Step::FeatureStepRef(name)
                | Step::Unknown(name)
                | Step::InvalidBudget {
                    algorithm: name, ..
                } => {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::UnknownEntry,
                        instance,
                        format!("'{}' is not an algorithm of this scenario", name),
                    ));
                }
            }
        }

        if schedule.is_empty() {
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::UnknownEntry,
                instance,
                "empty schedule selects no algorithm",
            ));
        }
        Ok(Replay {
            outcome: Outcome::new(instance, 0.0, false),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ScenarioBuilder, ScenarioTables};
    use approx::assert_relative_eq;

    fn two_algos(a: (f64, RunStatus), b: (f64, RunStatus)) -> ScenarioTables {
        ScenarioBuilder::runtime("sim", 10.0)
            .run("algoA", "inst", a.0, a.1)
            .run("algoB", "inst", b.0, b.1)
            .build()
            .unwrap()
    }

    fn replay(schedule: &[ScheduleEntry], data: &ScenarioTables) -> Replay {
        ScheduleReplaySimulator::replay(schedule, "inst", PerformanceType::Runtime, data).unwrap()
    }

    #[test]
    fn test_second_run_solves() {
        let data = two_algos((6.0, RunStatus::Ok), (3.0, RunStatus::Ok));
        let schedule = vec![
            ScheduleEntry::run("algoA", 4.0),
            ScheduleEntry::run("algoB", 8.0),
        ];
        let r = replay(&schedule, &data);
        assert!(r.outcome.solved);
        assert_relative_eq!(r.outcome.elapsed, 7.0);
        assert_eq!(r.outcome.algorithms, vec!["algoA", "algoB"]);
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn test_negative_budget_cannot_rewind_the_clock() {
        let data = two_algos((6.0, RunStatus::Ok), (3.0, RunStatus::Ok));
        let schedule = vec![
            ScheduleEntry::run("algoA", -100.0),
            ScheduleEntry::run("algoB", 5.0),
        ];
        let r = replay(&schedule, &data);
        assert!(r.outcome.solved);
        assert_relative_eq!(r.outcome.elapsed, 3.0);
        assert_eq!(r.outcome.algorithms, vec!["algoB"]);
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].kind, DiagnosticKind::InvalidBudget);
    }

    #[test]
    fn test_budget_over_cutoff_times_out_clamped() {
        let data = two_algos((12.0, RunStatus::Ok), (1.0, RunStatus::Ok));
        let r = replay(&[ScheduleEntry::run("algoA", 12.0)], &data);
        assert!(!r.outcome.solved);
        assert_relative_eq!(r.outcome.elapsed, 10.0);
    }

    #[test]
    fn test_solved_exactly_at_cutoff() {
        let data = two_algos((10.0, RunStatus::Ok), (1.0, RunStatus::Ok));
        let r = replay(&[ScheduleEntry::run_unlimited("algoA")], &data);
        assert!(r.outcome.solved);
        assert_relative_eq!(r.outcome.elapsed, 10.0);
    }

    #[test]
    fn test_non_ok_status_never_solves() {
        let data = two_algos((2.0, RunStatus::Crash), (1.0, RunStatus::Ok));
        let r = replay(&[ScheduleEntry::run("algoA", 5.0)], &data);
        assert!(!r.outcome.solved);
        assert_relative_eq!(r.outcome.elapsed, 10.0);
    }

    #[test]
    fn test_exhausted_schedule_counts_as_timeout() {
        let data = two_algos((6.0, RunStatus::Ok), (3.0, RunStatus::Ok));
        let r = replay(&[ScheduleEntry::run("algoA", 2.0)], &data);
        assert!(!r.outcome.solved);
        assert_relative_eq!(r.outcome.elapsed, 10.0);

        let empty = replay(&[], &data);
        assert!(!empty.outcome.solved);
        assert_relative_eq!(empty.outcome.elapsed, 10.0);
    }

    #[test]
    fn test_unknown_entry_skipped() {
        let data = two_algos((6.0, RunStatus::Ok), (3.0, RunStatus::Ok));
        let schedule = vec![
            ScheduleEntry::run("ghost", 4.0),
            ScheduleEntry::run("algoB", 4.0),
        ];
        let r = replay(&schedule, &data);
        assert!(r.outcome.solved);
        assert_relative_eq!(r.outcome.elapsed, 3.0);
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].kind, DiagnosticKind::UnknownEntry);
    }

    #[test]
    fn test_quality_rejects_multi_entry() {
        let data = ScenarioBuilder::quality("q", false)
            .performance("algoA", "inst", 1.0)
            .build()
            .unwrap();
        let schedule = vec![
            ScheduleEntry::run_unlimited("algoA"),
            ScheduleEntry::run_unlimited("algoA"),
        ];
        let err = ScheduleReplaySimulator::replay(
            &schedule,
            "inst",
            PerformanceType::SolutionQuality,
            &data,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MultiEntryQualitySchedule { entries: 2, .. }));
    }

    #[test]
    fn test_quality_ignores_budget() {
        let data = ScenarioBuilder::quality("q", false)
            .performance("algoA", "inst", 4.5)
            .build()
            .unwrap();
        let r = ScheduleReplaySimulator::replay(
            &[ScheduleEntry::run("algoA", 0.0)],
            "inst",
            PerformanceType::SolutionQuality,
            &data,
        )
        .unwrap();
        assert!(r.outcome.solved);
        assert_relative_eq!(r.outcome.elapsed, 4.5);
    }

    #[test]
    fn test_runtime_replay_without_cutoff_fails() {
        let data = ScenarioBuilder::quality("q", false)
            .performance("algoA", "inst", 4.5)
            .build()
            .unwrap();
        let result = ScheduleReplaySimulator::replay(
            &[ScheduleEntry::run("algoA", 1.0)],
            "inst",
            PerformanceType::Runtime,
            &data,
        );
        assert!(result.is_err());
    }
}
