//! # ASlib Validate Core
//!
//! Offline validation of algorithm-selection schedules against recorded
//! benchmark data.
//!
//! A system under evaluation hands in one schedule per test instance: an
//! ordered list of feature steps and time-budgeted algorithm runs. Instead of
//! running anything, the schedules are replayed against the performance
//! recorded in the scenario and scored.
//!
//! ## Core Components
//!
//! - **Scenario access**: [`ScenarioData`], [`ScenarioTables`], [`ScenarioBuilder`]
//! - **Schedules**: [`ScheduleEntry`], [`Budget`], [`ScheduleSet`]
//! - **Replay**: [`ScheduleReplaySimulator`] - runtime clock and quality lookup
//! - **Statistics**: [`StatsAccumulator`], [`StatsSummary`] - mergeable PAR1/PAR10 totals
//! - **Baselines**: [`BaselineComputer`], [`GapMetrics`] - oracle and single best solver
//! - **Orchestration**: [`Validator`], [`ValidatorConfig`], [`ValidationReport`]
//!
//! ## Scoring
//!
//! | Mode | Score | Failure cost |
//! |------|-------|--------------|
//! | `runtime` | PAR10 | `10 * cutoff` per timeout |
//! | `solution_quality` | mean quality | instance counted as failed |
//!
//! ## Example
//!
//! ```rust
//! use aslib_validate_core::{
//!     RunStatus, ScenarioBuilder, ScheduleEntry, ScheduleSet, Validator,
//! };
//!
//! let test = ScenarioBuilder::runtime("toy", 10.0)
//!     .run("algoA", "inst1", 6.0, RunStatus::Ok)
//!     .run("algoB", "inst1", 3.0, RunStatus::Ok)
//!     .build()
//!     .unwrap();
//!
//! let schedules = ScheduleSet::new().with(
//!     "inst1",
//!     vec![ScheduleEntry::run("algoA", 4.0), ScheduleEntry::run("algoB", 8.0)],
//! );
//!
//! let report = Validator::default()
//!     .validate_runtime(&schedules, &test, None)
//!     .unwrap();
//! assert_eq!(report.summary.solved, 1);
//! assert!((report.summary.par1 - 7.0).abs() < 1e-9);
//! ```

pub mod baseline;
pub mod diagnostic;
pub mod error;
pub mod report;
pub mod scenario;
pub mod schedule;
pub mod simulator;
pub mod stats;
pub mod validator;

// Re-exports
pub use baseline::{Baseline, BaselineComputer, GapMetrics, InstanceBaseline};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use error::{Error, Result};
pub use report::{fmt_gap, BaselineReport, ValidationReport};
pub use scenario::{
    FeatureStatus, PerformanceType, RunStatus, ScenarioBuilder, ScenarioData, ScenarioTables,
};
pub use schedule::{Budget, Schedule, ScheduleEntry, ScheduleSet, Step};
pub use simulator::{Replay, ScheduleReplaySimulator};
pub use stats::{BaselineTally, Outcome, StatsAccumulator, StatsSummary, PAR_FACTOR};
pub use validator::{Validator, ValidatorConfig};
