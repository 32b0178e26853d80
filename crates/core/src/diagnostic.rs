//! Non-fatal findings collected during a validation run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much a diagnostic matters for interpreting the scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A feature step ran before its prerequisites.
    DataInconsistency,
    /// A schedule entry names neither a known algorithm nor a known feature step.
    UnknownEntry,
    /// An algorithm run carries a negative or NaN budget.
    InvalidBudget,
    /// Oracle and single best solver coincide, gap metrics are undefined.
    DegenerateBaseline,
    /// A schedule was given for an instance outside the test split.
    ExtraSchedule,
}

/// One structured diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Instance the finding belongs to, `None` for run-level findings.
    pub instance: Option<String>,
    pub message: String,
}

impl Diagnostic {
    /// Creates a warning tied to an instance.
    pub fn warning(kind: DiagnosticKind, instance: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            instance: Some(instance.to_string()),
            message: message.into(),
        }
    }

    /// Creates a run-level warning.
    pub fn run_warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            instance: None,
            message: message.into(),
        }
    }

    /// Forwards the diagnostic to the `log` facade.
    pub(crate) fn log(&self) {
        match self.severity {
            Severity::Warning => log::warn!("{}", self),
            Severity::Info => log::info!("{}", self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(inst) => write!(f, "[{:?}] {}: {}", self.kind, inst, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}
