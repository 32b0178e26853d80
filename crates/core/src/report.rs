//! Validation report and its renderings.

use crate::diagnostic::{Diagnostic, Severity};
use crate::error::Result;
use crate::scenario::PerformanceType;
use crate::stats::{Outcome, StatsSummary};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Baseline section of a report. Scores are per-instance means in native units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineReport {
    /// Single best solver chosen on the training split.
    pub sbs: String,
    pub oracle_score: f64,
    pub sbs_score: f64,
    /// `None` when undefined (oracle equals SBS).
    pub gap_closed: Option<f64>,
    pub gap_remaining: Option<f64>,
    /// Instances where the system scored worse than the SBS.
    pub worse_than_sbs: usize,
}

/// Result of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub scenario: String,
    pub mode: PerformanceType,
    pub maximize: bool,
    pub cutoff_time: Option<f64>,
    /// Headline score: PAR10 (runtime) or mean quality in native units.
    pub score: f64,
    #[serde(flatten)]
    pub summary: StatsSummary,
    pub baseline: Option<BaselineReport>,
    pub diagnostics: Vec<Diagnostic>,
    pub outcomes: Vec<Outcome>,
    pub cancelled: bool,
    pub skipped_instances: usize,
    pub elapsed_ms: u64,
}

impl ValidationReport {
    /// Converts a per-instance value of [`outcomes`](Self::outcomes) back to
    /// native units.
    ///
    /// Outcome values are always on the normalized scale: the validator
    /// rejects maximized scenarios that have not been normalized, so there
    /// is no un-normalized case to pass through here.
    pub fn outcome_to_native(&self, value: f64) -> f64 {
        if self.maximize {
            -value
        } else {
            value
        }
    }

    /// Number of warning-level diagnostics.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Selection frequency as fractions of the averaged instances.
    pub fn selection_fractions(&self) -> Vec<(String, f64)> {
        let n = self.summary.instances.max(1) as f64;
        self.summary
            .selection_frequency
            .iter()
            .map(|(algo, count)| (algo.clone(), *count as f64 / n))
            .collect()
    }

    /// Logs the summary at info level, selection frequencies at debug.
    pub fn log_summary(&self) {
        let s = &self.summary;
        let n = s.instances;
        match self.mode {
            PerformanceType::Runtime => {
                log::info!("PAR1: {:.4}", s.par1);
                log::info!("PAR10: {:.4}", s.par10.unwrap_or(0.0));
                log::info!("Timeouts: {} / {}", s.timeouts, n);
                log::info!(
                    "Presolved during feature computation: {} / {}",
                    s.presolved_during_features,
                    n
                );
                log::info!("Solved: {} / {}", s.solved, n);
                let removed = if s.unsolvable_removed > 0 {
                    "removed"
                } else {
                    "not removed"
                };
                log::info!(
                    "Unsolvable ({}): {} / {}",
                    removed,
                    s.unsolvable,
                    n + s.unsolvable_removed
                );
            }
            PerformanceType::SolutionQuality => {
                log::info!("Number of instances: {}", n);
                log::info!("Average Solution Quality: {:.4}", self.score);
            }
        }
        if let Some(b) = &self.baseline {
            log::info!(
                "Oracle: {:.4}, SBS ({}): {:.4}, gap closed: {}",
                b.oracle_score,
                b.sbs,
                b.sbs_score,
                fmt_gap(b.gap_closed)
            );
        }
        log::debug!("Selection Frequency");
        for (algo, freq) in self.selection_fractions() {
            log::debug!("{}: {:.2}", algo, freq);
        }
    }

    /// Prints a summary table to stdout.
    pub fn print_summary(&self) {
        let s = &self.summary;
        println!("\n{:=<60}", "");
        println!("VALIDATION REPORT: {} ({})", self.scenario, self.mode);
        println!("{:=<60}", "");
        match self.mode {
            PerformanceType::Runtime => {
                println!("{:<36} {:>20.4}", "PAR1", s.par1);
                println!("{:<36} {:>20.4}", "PAR10", s.par10.unwrap_or(0.0));
                println!(
                    "{:<36} {:>20}",
                    "Timeouts",
                    format!("{} / {}", s.timeouts, s.instances)
                );
                println!(
                    "{:<36} {:>20}",
                    "Solved",
                    format!("{} / {}", s.solved, s.instances)
                );
                println!(
                    "{:<36} {:>20}",
                    "Presolved during features",
                    s.presolved_during_features
                );
                println!(
                    "{:<36} {:>20}",
                    "Unsolvable",
                    format!("{} ({} removed)", s.unsolvable, s.unsolvable_removed)
                );
            }
            PerformanceType::SolutionQuality => {
                println!("{:<36} {:>20}", "Instances", s.instances);
                println!("{:<36} {:>20.4}", "Average solution quality", self.score);
                println!("{:<36} {:>20}", "Without selection", s.timeouts);
            }
        }

        if let Some(b) = &self.baseline {
            println!("{:-<60}", "");
            println!("{:<36} {:>20.4}", "Oracle", b.oracle_score);
            println!("{:<36} {:>20.4}", format!("SBS ({})", b.sbs), b.sbs_score);
            println!("{:<36} {:>20}", "Gap closed", fmt_gap(b.gap_closed));
            println!("{:<36} {:>20}", "Gap remaining", fmt_gap(b.gap_remaining));
            println!("{:<36} {:>20}", "Worse than SBS", b.worse_than_sbs);
        }

        if !s.selection_frequency.is_empty() {
            println!("{:-<60}", "");
            println!("{:<36} {:>10} {:>9}", "Algorithm", "Selected", "Share");
            for (algo, share) in self.selection_fractions() {
                let count = s.selection_frequency.get(&algo).copied().unwrap_or(0);
                println!("{:<36} {:>10} {:>8.1}%", algo, count, share * 100.0);
            }
        }

        if !self.diagnostics.is_empty() {
            println!("{:-<60}", "");
            println!("Diagnostics: {} ({} warnings)", self.diagnostics.len(), self.warning_count());
            for d in self.diagnostics.iter().take(10) {
                println!("  {}", d);
            }
        }
        if self.cancelled {
            println!("CANCELLED: {} instance(s) not replayed", self.skipped_instances);
        }
        println!("{:=<60}\n", "");
    }

    /// Renders the report as Markdown.
    pub fn to_markdown(&self) -> String {
        let s = &self.summary;
        let mut md = String::new();

        md.push_str(&format!("# Validation Report: {}\n\n", self.scenario));
        md.push_str(&format!("*Mode: {}*\n\n", self.mode));

        md.push_str("## Summary\n\n");
        md.push_str("| Metric | Value |\n");
        md.push_str("|--------|-------|\n");
        match self.mode {
            PerformanceType::Runtime => {
                md.push_str(&format!("| PAR1 | {:.4} |\n", s.par1));
                md.push_str(&format!("| PAR10 | {:.4} |\n", s.par10.unwrap_or(0.0)));
                md.push_str(&format!("| Timeouts | {} / {} |\n", s.timeouts, s.instances));
                md.push_str(&format!("| Solved | {} / {} |\n", s.solved, s.instances));
                md.push_str(&format!(
                    "| Presolved during features | {} |\n",
                    s.presolved_during_features
                ));
                md.push_str(&format!(
                    "| Unsolvable | {} ({} removed) |\n",
                    s.unsolvable, s.unsolvable_removed
                ));
            }
            PerformanceType::SolutionQuality => {
                md.push_str(&format!("| Instances | {} |\n", s.instances));
                md.push_str(&format!("| Average Solution Quality | {:.4} |\n", self.score));
            }
        }
        md.push('\n');

        if let Some(b) = &self.baseline {
            md.push_str("## Baselines\n\n");
            md.push_str("| Baseline | Score |\n");
            md.push_str("|----------|-------|\n");
            md.push_str(&format!("| Oracle | {:.4} |\n", b.oracle_score));
            md.push_str(&format!("| SBS ({}) | {:.4} |\n", b.sbs, b.sbs_score));
            md.push_str(&format!("| Gap closed | {} |\n", fmt_gap(b.gap_closed)));
            md.push_str(&format!("| Gap remaining | {} |\n", fmt_gap(b.gap_remaining)));
            md.push_str(&format!("| Worse than SBS | {} |\n", b.worse_than_sbs));
            md.push('\n');
        }

        if !s.selection_frequency.is_empty() {
            md.push_str("## Selection Frequency\n\n");
            md.push_str("| Algorithm | Selected | Share |\n");
            md.push_str("|-----------|----------|-------|\n");
            for (algo, share) in self.selection_fractions() {
                let count = s.selection_frequency.get(&algo).copied().unwrap_or(0);
                md.push_str(&format!("| {} | {} | {:.1}% |\n", algo, count, share * 100.0));
            }
            md.push('\n');
        }

        if !self.diagnostics.is_empty() {
            md.push_str("## Diagnostics\n\n");
            for d in &self.diagnostics {
                md.push_str(&format!("- {}\n", d));
            }
            md.push('\n');
        }

        md
    }

    /// Saves the report as pretty JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads a report saved with [`save_json`](Self::save_json).
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Formats a gap value, spelling out undefined gaps.
pub fn fmt_gap(gap: Option<f64>) -> String {
    gap.map_or_else(|| "undefined".to_string(), |g| format!("{:.4}", g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticKind;
    use std::collections::BTreeMap;

    fn report() -> ValidationReport {
        let mut freq = BTreeMap::new();
        freq.insert("algoA".to_string(), 3);
        freq.insert("algoB".to_string(), 1);
        ValidationReport {
            scenario: "toy".to_string(),
            mode: PerformanceType::Runtime,
            maximize: false,
            cutoff_time: Some(10.0),
            score: 30.0,
            summary: StatsSummary {
                instances: 4,
                par1: 6.0,
                par10: Some(30.0),
                solved: 3,
                timeouts: 1,
                unsolvable: 0,
                unsolvable_removed: 0,
                presolved_during_features: 1,
                timeout_rate: 0.25,
                solved_rate: 0.75,
                unsolvable_rate: 0.0,
                selection_frequency: freq,
            },
            baseline: Some(BaselineReport {
                sbs: "algoA".to_string(),
                oracle_score: 5.0,
                sbs_score: 5.0,
                gap_closed: None,
                gap_remaining: None,
                worse_than_sbs: 2,
            }),
            diagnostics: vec![Diagnostic::warning(
                DiagnosticKind::UnknownEntry,
                "i1",
                "'x' is neither an algorithm nor a feature step",
            )],
            outcomes: Vec::new(),
            cancelled: false,
            skipped_instances: 0,
            elapsed_ms: 1,
        }
    }

    #[test]
    fn test_markdown_contains_sections() {
        let md = report().to_markdown();
        assert!(md.contains("# Validation Report: toy"));
        assert!(md.contains("| PAR10 | 30.0000 |"));
        assert!(md.contains("| Gap closed | undefined |"));
        assert!(md.contains("## Selection Frequency"));
        assert!(md.contains("UnknownEntry"));
    }

    #[test]
    fn test_outcome_to_native_undoes_maximize_negation() {
        let mut r = report();
        assert_eq!(r.outcome_to_native(7.5), 7.5);

        r.mode = PerformanceType::SolutionQuality;
        r.maximize = true;
        assert_eq!(r.outcome_to_native(-5.0), 5.0);
    }

    #[test]
    fn test_selection_fractions() {
        let fractions = report().selection_fractions();
        assert_eq!(fractions[0], ("algoA".to_string(), 0.75));
        assert_eq!(fractions[1], ("algoB".to_string(), 0.25));
    }

    #[test]
    fn test_json_flattens_summary() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["par10"], 30.0);
        assert_eq!(json["solved"], 3);
        assert!(json["baseline"]["gap_closed"].is_null());

        let back: ValidationReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report());
    }
}
