//! Error types for schedule validation.
//!
//! Only conditions that must abort a validation run live here. Anomalies that
//! leave the rest of the run meaningful are reported as
//! [`Diagnostic`](crate::diagnostic::Diagnostic)s instead.

use crate::scenario::PerformanceType;
use thiserror::Error;

/// Errors that abort a validation run before any scoring happens.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested validation mode does not match the scenario's performance type.
    #[error("cannot validate a {scenario} scenario with {requested} validation")]
    ModeMismatch {
        /// Mode requested by the caller.
        requested: PerformanceType,
        /// Performance type declared by the test scenario.
        scenario: PerformanceType,
    },

    /// Some test instances have no schedule.
    #[error("missing schedules for {} instance(s): {}", .0.len(), .0.join(", "))]
    MissingSchedules(Vec<String>),

    /// A solution-quality schedule lists more than one entry.
    #[error("solution quality schedules must hold exactly one entry, instance {instance} has {entries}")]
    MultiEntryQualitySchedule {
        /// Offending instance.
        instance: String,
        /// Number of entries in its schedule.
        entries: usize,
    },

    /// Scenario tables violate a structural invariant.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// Two accumulators with different cutoffs cannot be merged.
    #[error("cannot merge statistics with cutoff {left:?} into statistics with cutoff {right:?}")]
    IncompatibleStats {
        /// Cutoff of the accumulator being merged in.
        left: Option<f64>,
        /// Cutoff of the receiving accumulator.
        right: Option<f64>,
    },

    /// The dedicated replay thread pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// I/O failure while writing a report.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for input-contract violations (as opposed to I/O failures).
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::ModeMismatch { .. }
                | Error::MissingSchedules(_)
                | Error::MultiEntryQualitySchedule { .. }
                | Error::InvalidScenario(_)
        )
    }
}

/// Result type alias for validation operations.
pub type Result<T> = std::result::Result<T, Error>;
