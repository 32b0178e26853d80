//! Result files: schedule JSON in, per-instance outcomes out.

use aslib_validate_core::{fmt_gap, Result, ScheduleSet, ValidationReport};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Reads a schedule file (`{"inst": [entries...]}`).
pub fn read_schedules(path: impl AsRef<Path>) -> Result<ScheduleSet> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let schedules = ScheduleSet::from_json(&content)?;
    log::info!(
        "Read schedules for {} instances from {}",
        schedules.len(),
        path.display()
    );
    Ok(schedules)
}

/// Writes a schedule file, overwriting any existing one.
pub fn write_schedules(path: impl AsRef<Path>, schedules: &ScheduleSet) -> Result<()> {
    fs::write(path, schedules.to_json_pretty()?)?;
    Ok(())
}

/// Writes one CSV row per replayed instance.
pub fn save_outcomes_csv(report: &ValidationReport, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path)?;

    writeln!(
        file,
        "instance,solved,elapsed,penalized,unsolvable,presolved,algorithms,oracle,sbs"
    )?;

    let native = |v: f64| format!("{:.4}", report.outcome_to_native(v));
    for o in &report.outcomes {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{}",
            o.instance,
            o.solved,
            native(o.elapsed),
            o.penalized_score(report.cutoff_time)
                .map_or(String::new(), native),
            o.unsolvable,
            o.presolved,
            o.algorithms.join(";"),
            o.baseline.map_or(String::new(), |b| native(b.oracle)),
            o.baseline.map_or(String::new(), |b| native(b.sbs)),
        )?;
    }

    Ok(())
}

/// One-line summary used by the CLI after a run.
pub fn summary_line(report: &ValidationReport) -> String {
    let s = &report.summary;
    let gap = report
        .baseline
        .as_ref()
        .map_or("n/a".to_string(), |b| fmt_gap(b.gap_closed));
    format!(
        "{}: score={:.4} solved={}/{} gap_closed={}",
        report.scenario, report.score, s.solved, s.instances, gap
    )
}
