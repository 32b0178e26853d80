//! Mergeable penalized-runtime statistics.
//!
//! A [`StatsAccumulator`] folds per-instance [`Outcome`]s. Accumulators built
//! on disjoint shards of the instances can be merged in any order, which is
//! what makes replay embarrassingly parallel.

use crate::baseline::InstanceBaseline;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timeout penalty factor of PAR10.
pub const PAR_FACTOR: f64 = 10.0;

/// Result of replaying one instance's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub instance: String,
    /// Runtime mode: time used, clamped to the cutoff on timeout.
    /// Quality mode: normalized quality of the selected algorithm.
    pub elapsed: f64,
    pub solved: bool,
    /// No algorithm has run status `ok` on this instance.
    pub unsolvable: bool,
    /// Solved by a feature step reporting `presolved`.
    pub presolved: bool,
    /// Algorithms started (runtime) or selected (quality), without repeats.
    pub algorithms: Vec<String>,
    /// Oracle and single best solver costs for this instance, if known.
    pub baseline: Option<InstanceBaseline>,
}

impl Outcome {
    pub fn new(instance: impl Into<String>, elapsed: f64, solved: bool) -> Self {
        Self {
            instance: instance.into(),
            elapsed,
            solved,
            unsolvable: false,
            presolved: false,
            algorithms: Vec::new(),
            baseline: None,
        }
    }

    /// Per-instance score on the baseline scale.
    ///
    /// Runtime: elapsed when solved, `PAR_FACTOR * cutoff` otherwise.
    /// Quality: the achieved value, `None` when nothing was selected.
    pub fn penalized_score(&self, cutoff: Option<f64>) -> Option<f64> {
        match cutoff {
            Some(c) if !self.solved => Some(PAR_FACTOR * c),
            Some(_) => Some(self.elapsed),
            None if self.solved => Some(self.elapsed),
            None => None,
        }
    }

    pub(crate) fn note_algorithm(&mut self, algorithm: &str) {
        if !self.algorithms.iter().any(|a| a == algorithm) {
            self.algorithms.push(algorithm.to_string());
        }
    }
}

/// Running totals over a set of outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsAccumulator {
    cutoff: Option<f64>,
    pub par1_sum: f64,
    pub timeout_count: usize,
    pub solved_count: usize,
    pub unsolvable_count: usize,
    /// Unsolvable instances that also timed out; these are what exclusion removes.
    pub unsolvable_timeout_count: usize,
    pub presolved_feature_count: usize,
    /// Baseline totals over outcomes that always stay in the averages.
    pub baseline: BaselineTally,
    /// Baseline totals over unsolvable timeouts, which exclusion removes.
    pub removable_baseline: BaselineTally,
    pub selection_frequency: BTreeMap<String, usize>,
}

impl StatsAccumulator {
    /// Empty accumulator. `cutoff` is `None` for solution-quality runs.
    pub fn new(cutoff: Option<f64>) -> Self {
        Self {
            cutoff,
            par1_sum: 0.0,
            timeout_count: 0,
            solved_count: 0,
            unsolvable_count: 0,
            unsolvable_timeout_count: 0,
            presolved_feature_count: 0,
            baseline: BaselineTally::default(),
            removable_baseline: BaselineTally::default(),
            selection_frequency: BTreeMap::new(),
        }
    }

    pub fn cutoff(&self) -> Option<f64> {
        self.cutoff
    }

    /// Number of outcomes folded in.
    pub fn count(&self) -> usize {
        self.solved_count + self.timeout_count
    }

    /// Adds one outcome.
    pub fn fold(&mut self, outcome: &Outcome) {
        if outcome.solved {
            self.solved_count += 1;
            self.par1_sum += outcome.elapsed;
            if outcome.presolved {
                self.presolved_feature_count += 1;
            }
        } else {
            self.timeout_count += 1;
            if let Some(c) = self.cutoff {
                self.par1_sum += c;
            }
            if outcome.unsolvable {
                self.unsolvable_timeout_count += 1;
            }
        }
        if outcome.unsolvable {
            self.unsolvable_count += 1;
        }

        for algo in &outcome.algorithms {
            *self.selection_frequency.entry(algo.clone()).or_default() += 1;
        }

        if let (Some(baseline), Some(score)) =
            (&outcome.baseline, outcome.penalized_score(self.cutoff))
        {
            let removable = self.cutoff.is_some() && outcome.unsolvable && !outcome.solved;
            let tally = if removable {
                &mut self.removable_baseline
            } else {
                &mut self.baseline
            };
            tally.add(score, baseline);
        }
    }

    /// Consuming variant of [`fold`](Self::fold), handy for iterator folds.
    pub fn folded(mut self, outcome: &Outcome) -> Self {
        self.fold(outcome);
        self
    }

    /// Adds another accumulator field by field.
    pub fn merge(&mut self, other: &StatsAccumulator) -> Result<()> {
        if self.cutoff != other.cutoff {
            return Err(Error::IncompatibleStats {
                left: other.cutoff,
                right: self.cutoff,
            });
        }
        self.par1_sum += other.par1_sum;
        self.timeout_count += other.timeout_count;
        self.solved_count += other.solved_count;
        self.unsolvable_count += other.unsolvable_count;
        self.unsolvable_timeout_count += other.unsolvable_timeout_count;
        self.presolved_feature_count += other.presolved_feature_count;
        self.baseline.merge(&other.baseline);
        self.removable_baseline.merge(&other.removable_baseline);
        for (algo, n) in &other.selection_frequency {
            *self.selection_frequency.entry(algo.clone()).or_default() += n;
        }
        Ok(())
    }

    /// Baseline totals over the same outcomes that
    /// [`summarize`](Self::summarize) averages for the same flag.
    pub fn baseline_totals(&self, remove_unsolvable: bool) -> BaselineTally {
        let mut totals = self.baseline.clone();
        if !remove_unsolvable {
            totals.merge(&self.removable_baseline);
        }
        totals
    }

    /// Projects the totals into averages.
    ///
    /// With `remove_unsolvable`, unsolvable instances that timed out are
    /// dropped from the denominator and their cutoff charges from the sums.
    /// Ignored in quality mode.
    pub fn summarize(&self, remove_unsolvable: bool) -> StatsSummary {
        match self.cutoff {
            Some(cutoff) => self.summarize_runtime(cutoff, remove_unsolvable),
            None => self.summarize_quality(),
        }
    }

    fn summarize_runtime(&self, cutoff: f64, remove_unsolvable: bool) -> StatsSummary {
        let removed = if remove_unsolvable {
            self.unsolvable_timeout_count
        } else {
            0
        };
        let timeouts = self.timeout_count - removed;
        let par1_total = self.par1_sum - removed as f64 * cutoff;
        let par10_total = par1_total + (PAR_FACTOR - 1.0) * cutoff * timeouts as f64;
        let n = timeouts + self.solved_count;

        StatsSummary {
            instances: n,
            par1: ratio(par1_total, n),
            par10: Some(ratio(par10_total, n)),
            solved: self.solved_count,
            timeouts,
            unsolvable: self.unsolvable_count,
            unsolvable_removed: removed,
            presolved_during_features: self.presolved_feature_count,
            timeout_rate: ratio(timeouts as f64, n),
            solved_rate: ratio(self.solved_count as f64, n),
            unsolvable_rate: ratio(self.unsolvable_count as f64, self.count()),
            selection_frequency: self.selection_frequency.clone(),
        }
    }

    fn summarize_quality(&self) -> StatsSummary {
        let n = self.solved_count;
        StatsSummary {
            instances: n,
            par1: ratio(self.par1_sum, n),
            par10: None,
            solved: self.solved_count,
            timeouts: self.timeout_count,
            unsolvable: 0,
            unsolvable_removed: 0,
            presolved_during_features: 0,
            timeout_rate: ratio(self.timeout_count as f64, self.count()),
            solved_rate: ratio(self.solved_count as f64, self.count()),
            unsolvable_rate: 0.0,
            selection_frequency: self.selection_frequency.clone(),
        }
    }
}

/// Summed per-instance system, oracle and single best solver scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineTally {
    /// Number of outcomes that carried baseline costs.
    pub count: usize,
    pub system_sum: f64,
    pub oracle_sum: f64,
    pub sbs_sum: f64,
    pub worse_than_sbs: usize,
}

impl BaselineTally {
    fn add(&mut self, score: f64, baseline: &InstanceBaseline) {
        self.count += 1;
        self.system_sum += score;
        self.oracle_sum += baseline.oracle;
        self.sbs_sum += baseline.sbs;
        if score > baseline.sbs {
            self.worse_than_sbs += 1;
        }
    }

    fn merge(&mut self, other: &BaselineTally) {
        self.count += other.count;
        self.system_sum += other.system_sum;
        self.oracle_sum += other.oracle_sum;
        self.sbs_sum += other.sbs_sum;
        self.worse_than_sbs += other.worse_than_sbs;
    }

    /// Mean of a sum over this tally, 0 when empty.
    pub fn mean(&self, sum: f64) -> f64 {
        ratio(sum, self.count)
    }
}

fn ratio(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Averages derived from a [`StatsAccumulator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Denominator of the averages.
    pub instances: usize,
    /// PAR1 in runtime mode, mean normalized quality in quality mode.
    pub par1: f64,
    /// Runtime mode only.
    pub par10: Option<f64>,
    pub solved: usize,
    /// Timeouts (runtime) or instances without a selected algorithm (quality).
    pub timeouts: usize,
    pub unsolvable: usize,
    pub unsolvable_removed: usize,
    pub presolved_during_features: usize,
    pub timeout_rate: f64,
    pub solved_rate: f64,
    pub unsolvable_rate: f64,
    pub selection_frequency: BTreeMap<String, usize>,
}
