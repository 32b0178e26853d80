//! Multi-system comparison and report generation.
//!
//! Takes validation reports of several selectors on the same test split and
//! ranks them by score, gap closed and solved count, with a per-instance win
//! matrix.

use aslib_validate_core::{fmt_gap, Outcome, PerformanceType, ValidationReport};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Comparison of several systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Report title
    pub title: String,
    /// Scenario the systems were validated on
    pub scenario: String,
    pub mode: PerformanceType,
    /// Per-system figures, in the order systems were added
    pub systems: Vec<SystemAnalysis>,
    /// Pairwise instance wins
    pub comparison: SystemComparison,
    pub rankings: Rankings,
}

/// Headline figures of one system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemAnalysis {
    pub system: String,
    /// PAR10 (runtime) or mean quality in native units
    pub score: f64,
    pub par1: f64,
    pub solved: usize,
    pub instances: usize,
    pub gap_closed: Option<f64>,
    /// Instances on which this system is strictly best
    pub wins: usize,
}

/// Pairwise win matrix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemComparison {
    pub systems: Vec<String>,
    /// win_matrix\[i\]\[j\]: instances where system i beats system j
    pub win_matrix: Vec<Vec<usize>>,
}

/// Rankings by several criteria.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rankings {
    pub by_score: Vec<RankEntry>,
    /// Systems without a defined gap are left out
    pub by_gap_closed: Vec<RankEntry>,
    pub by_solved: Vec<RankEntry>,
}

/// A ranking entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankEntry {
    /// Rank (1-based)
    pub rank: usize,
    pub system: String,
    pub value: f64,
}

/// Collects named reports and compares them.
#[derive(Debug, Default)]
pub struct Comparison {
    reports: Vec<(String, ValidationReport)>,
}

impl Comparison {
    pub fn new() -> Self {
        Self {
            reports: Vec::new(),
        }
    }

    /// Adds the report of one system.
    pub fn add_report(&mut self, system: impl Into<String>, report: ValidationReport) {
        self.reports.push((system.into(), report));
    }

    /// Loads a report saved as JSON; the system is named after the file stem.
    pub fn load_json(&mut self, path: impl AsRef<Path>) -> aslib_validate_core::Result<()> {
        let path = path.as_ref();
        let report = ValidationReport::load_json(path)?;
        let system = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("system{}", self.reports.len() + 1));
        self.add_report(system, report);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Builds the comparison report.
    pub fn analyze(&self) -> ComparisonReport {
        let (scenario, mode) = self
            .reports
            .first()
            .map(|(_, r)| (r.scenario.clone(), r.mode))
            .unwrap_or((String::new(), PerformanceType::Runtime));
        for (system, report) in &self.reports {
            if report.scenario != scenario || report.mode != mode {
                log::warn!(
                    "System '{}' was validated on '{}' ({}), comparing against '{}' ({})",
                    system,
                    report.scenario,
                    report.mode,
                    scenario,
                    mode
                );
            }
        }

        let comparison = self.compute_comparison();
        let wins = self.compute_wins();
        let systems: Vec<SystemAnalysis> = self
            .reports
            .iter()
            .map(|(system, r)| SystemAnalysis {
                system: system.clone(),
                score: r.score,
                par1: r.summary.par1,
                solved: r.summary.solved,
                instances: r.summary.instances,
                gap_closed: r.baseline.as_ref().and_then(|b| b.gap_closed),
                wins: wins.get(system.as_str()).copied().unwrap_or(0),
            })
            .collect();
        let higher_is_better = self
            .reports
            .first()
            .map_or(false, |(_, r)| r.mode == PerformanceType::SolutionQuality && r.maximize);
        let rankings = Self::compute_rankings(&systems, higher_is_better);

        ComparisonReport {
            title: "Algorithm Selection Comparison".to_string(),
            scenario,
            mode,
            systems,
            comparison,
            rankings,
        }
    }

    /// Per-instance cost on the common "smaller is better" scale.
    fn instance_costs(report: &ValidationReport) -> HashMap<&str, f64> {
        report
            .outcomes
            .iter()
            .map(|o: &Outcome| {
                let cost = o.penalized_score(report.cutoff_time).unwrap_or(f64::INFINITY);
                (o.instance.as_str(), cost)
            })
            .collect()
    }

    fn compute_wins(&self) -> HashMap<&str, usize> {
        let costs: Vec<(&str, HashMap<&str, f64>)> = self
            .reports
            .iter()
            .map(|(s, r)| (s.as_str(), Self::instance_costs(r)))
            .collect();
        let mut wins: HashMap<&str, usize> = HashMap::new();
        let Some((_, first)) = costs.first() else {
            return wins;
        };

        for inst in first.keys() {
            let mut best: Option<(&str, f64)> = None;
            let mut tied = false;
            for (system, c) in &costs {
                let Some(&cost) = c.get(inst) else {
                    continue;
                };
                match best {
                    Some((_, b)) if cost == b => tied = true,
                    Some((_, b)) if cost > b => {}
                    _ => {
                        best = Some((*system, cost));
                        tied = false;
                    }
                }
            }
            if let (Some((system, _)), false) = (best, tied) {
                *wins.entry(system).or_default() += 1;
            }
        }
        wins
    }

    fn compute_comparison(&self) -> SystemComparison {
        let systems: Vec<String> = self.reports.iter().map(|(s, _)| s.clone()).collect();
        let n = systems.len();
        if n == 0 {
            return SystemComparison::default();
        }

        let costs: Vec<HashMap<&str, f64>> = self
            .reports
            .iter()
            .map(|(_, r)| Self::instance_costs(r))
            .collect();
        let mut win_matrix = vec![vec![0usize; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                win_matrix[i][j] = costs[i]
                    .iter()
                    .filter(|(inst, ci)| costs[j].get(*inst).map_or(false, |cj| *ci < cj))
                    .count();
            }
        }

        SystemComparison {
            systems,
            win_matrix,
        }
    }

    fn compute_rankings(systems: &[SystemAnalysis], higher_is_better: bool) -> Rankings {
        let mut by_score: Vec<_> = systems
            .iter()
            .map(|s| (s.system.clone(), s.score))
            .collect();
        by_score.sort_by(|a, b| {
            let ord = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
            if higher_is_better {
                ord.reverse()
            } else {
                ord
            }
        });

        let mut by_gap_closed: Vec<_> = systems
            .iter()
            .filter_map(|s| s.gap_closed.map(|g| (s.system.clone(), g)))
            .collect();
        by_gap_closed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut by_solved: Vec<_> = systems
            .iter()
            .map(|s| (s.system.clone(), s.solved as f64))
            .collect();
        by_solved.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let to_rank_entries = |items: Vec<(String, f64)>| -> Vec<RankEntry> {
            items
                .into_iter()
                .enumerate()
                .map(|(i, (system, value))| RankEntry {
                    rank: i + 1,
                    system,
                    value,
                })
                .collect()
        };

        Rankings {
            by_score: to_rank_entries(by_score),
            by_gap_closed: to_rank_entries(by_gap_closed),
            by_solved: to_rank_entries(by_solved),
        }
    }
}

/// Report generator for various output formats.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Generates a Markdown report.
    pub fn to_markdown(report: &ComparisonReport) -> String {
        let mut md = String::new();
        let score_label = match report.mode {
            PerformanceType::Runtime => "PAR10",
            PerformanceType::SolutionQuality => "Avg Quality",
        };

        md.push_str(&format!("# {}\n\n", report.title));
        md.push_str(&format!("*Scenario: {} ({})*\n\n", report.scenario, report.mode));

        md.push_str("## Systems\n\n");
        md.push_str(&format!(
            "| System | {} | PAR1 | Solved | Gap Closed | Wins |\n",
            score_label
        ));
        md.push_str("|--------|------|------|--------|------------|------|\n");
        for s in &report.systems {
            md.push_str(&format!(
                "| {} | {:.4} | {:.4} | {} / {} | {} | {} |\n",
                s.system,
                s.score,
                s.par1,
                s.solved,
                s.instances,
                fmt_gap(s.gap_closed),
                s.wins
            ));
        }
        md.push('\n');

        md.push_str("## Rankings\n\n");

        md.push_str("### By Score\n\n");
        md.push_str(&format!("| Rank | System | {} |\n", score_label));
        md.push_str("|------|--------|-------|\n");
        for r in &report.rankings.by_score {
            md.push_str(&format!("| {} | {} | {:.4} |\n", r.rank, r.system, r.value));
        }
        md.push('\n');

        if !report.rankings.by_gap_closed.is_empty() {
            md.push_str("### By Gap Closed\n\n");
            md.push_str("| Rank | System | Gap Closed |\n");
            md.push_str("|------|--------|------------|\n");
            for r in &report.rankings.by_gap_closed {
                md.push_str(&format!("| {} | {} | {:.4} |\n", r.rank, r.system, r.value));
            }
            md.push('\n');
        }

        md.push_str("### By Solved\n\n");
        md.push_str("| Rank | System | Solved |\n");
        md.push_str("|------|--------|--------|\n");
        for r in &report.rankings.by_solved {
            md.push_str(&format!("| {} | {} | {:.0} |\n", r.rank, r.system, r.value));
        }
        md.push('\n');

        if !report.comparison.systems.is_empty() {
            md.push_str("## Win Matrix\n\n");
            md.push_str("*Cell [i,j] shows on how many instances system i beats system j*\n\n");

            md.push_str("| vs |");
            for s in &report.comparison.systems {
                md.push_str(&format!(" {} |", s));
            }
            md.push_str("\n|");
            for _ in 0..=report.comparison.systems.len() {
                md.push_str("----|");
            }
            md.push('\n');

            for (i, si) in report.comparison.systems.iter().enumerate() {
                md.push_str(&format!("| {} |", si));
                for j in 0..report.comparison.systems.len() {
                    if i == j {
                        md.push_str(" - |");
                    } else {
                        md.push_str(&format!(" {} |", report.comparison.win_matrix[i][j]));
                    }
                }
                md.push('\n');
            }
        }

        md
    }

    /// Saves the report as JSON.
    pub fn save_json(report: &ComparisonReport, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    /// Saves the report as Markdown.
    pub fn save_markdown(report: &ComparisonReport, path: impl AsRef<Path>) -> std::io::Result<()> {
        fs::write(path, Self::to_markdown(report))
    }
}
