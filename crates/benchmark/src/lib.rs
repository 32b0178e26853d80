//! Scenario loading and tooling around the validator.
//!
//! This crate provides:
//! - A minimal ARFF reader
//! - An ASlib scenario directory loader producing normalized tables
//! - Schedule (result) file I/O and per-instance CSV export
//! - A single best solver schedule generator
//! - Multi-system comparison and report generation
//! - TOML run configuration for the `validate-runner` CLI

mod analyzer;
mod arff;
mod config;
mod loader;
mod results;
mod single_best;

pub use analyzer::{
    Comparison, ComparisonReport, RankEntry, Rankings, ReportGenerator, SystemAnalysis,
    SystemComparison,
};
pub use arff::{ArffAttribute, ArffError, ArffFile};
pub use config::{ConfigError, OutputSection, RunConfig, ValidationSection};
pub use loader::{
    LoadError, ScenarioDescription, ScenarioLoader, ALGORITHM_RUNS_FILE, DESCRIPTION_FILE,
    FEATURE_COSTS_FILE, FEATURE_RUNSTATUS_FILE, FEATURE_VALUES_FILE,
};
pub use results::{read_schedules, save_outcomes_csv, summary_line, write_schedules};
pub use single_best::SingleBest;
