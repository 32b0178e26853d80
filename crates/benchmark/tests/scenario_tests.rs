//! Integration tests over on-disk ASlib scenario directories.

use aslib_validate_benchmark::{
    read_schedules, save_outcomes_csv, summary_line, write_schedules, Comparison, LoadError,
    RunConfig, ScenarioLoader, SingleBest,
};
use aslib_validate_core::{
    DiagnosticKind, Error, PerformanceType, RunStatus, ScenarioData, ScheduleSet,
    ValidationReport, Validator,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const RUNTIME_DESCRIPTION: &str = "\
scenario_id: TOY
performance_measures: [runtime]
maximize: [false]
performance_type: [runtime]
algorithm_cutoff_time: 100
algorithm_cutoff_memory: '?'
features_cutoff_time: '?'
features_deterministic: [f1, f2]
features_stochastic: []
algorithms_deterministic: [a1, a2]
algorithms_stochastic: []
feature_steps:
  basic:
    provides: [f1]
  extra:
    requires: basic
    provides: [f2]
";

const RUNTIME_RUNS: &str = "\
@RELATION ALGORITHM_RUNS_TOY

@ATTRIBUTE instance_id STRING
@ATTRIBUTE repetition NUMERIC
@ATTRIBUTE algorithm STRING
@ATTRIBUTE runtime NUMERIC
@ATTRIBUTE runstatus {ok, timeout, memout, not_applicable, crash, other}

@DATA
i1,1,a1,10.0,ok
i1,1,a2,50.0,ok
i2,1,a1,?,timeout
i2,2,a2,5.0,ok
i2,1,a2,20.0,ok
i3,1,a1,100,timeout
i3,1,a2,100,crash
";

const FEATURE_COSTS: &str = "\
@RELATION FEATURE_COSTS_TOY

@ATTRIBUTE instance_id STRING
@ATTRIBUTE repetition NUMERIC
@ATTRIBUTE basic NUMERIC
@ATTRIBUTE extra NUMERIC

@DATA
i1,1,1.0,2.0
i2,1,3.0,?
i3,1,0.5,0.5
";

const FEATURE_RUNSTATUS: &str = "\
@RELATION FEATURE_RUNSTATUS_TOY

@ATTRIBUTE instance_id STRING
@ATTRIBUTE repetition NUMERIC
@ATTRIBUTE basic {ok, timeout, memout, presolved, crash, other, unknown}
@ATTRIBUTE extra {ok, timeout, memout, presolved, crash, other, unknown}

@DATA
i1,1,ok,ok
i2,1,presolved,ok
i3,1,ok,ok
";

const QUALITY_DESCRIPTION: &str = "\
scenario_id: QTOY
performance_measures: [score]
maximize: [true]
performance_type: [solution_quality]
algorithm_cutoff_time: '?'
feature_steps:
  basic: [f1]
";

const QUALITY_RUNS: &str = "\
@RELATION ALGORITHM_RUNS_QTOY

@ATTRIBUTE instance_id STRING
@ATTRIBUTE repetition NUMERIC
@ATTRIBUTE algorithm STRING
@ATTRIBUTE score NUMERIC

@DATA
q1,1,a1,5.0
q1,1,a2,3.0
q2,1,a1,1.0
q2,1,a2,4.0
";

fn write_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn runtime_dir() -> TempDir {
    write_dir(&[
        ("description.txt", RUNTIME_DESCRIPTION),
        ("algorithm_runs.arff", RUNTIME_RUNS),
        ("feature_costs.arff", FEATURE_COSTS),
        ("feature_runstatus.arff", FEATURE_RUNSTATUS),
    ])
}

fn quality_dir() -> TempDir {
    write_dir(&[
        ("description.txt", QUALITY_DESCRIPTION),
        ("algorithm_runs.arff", QUALITY_RUNS),
    ])
}

fn schedules_file(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("results.json");
    fs::write(&path, json).unwrap();
    path
}

mod loader_tests {
    use super::*;

    #[test]
    fn test_read_description() {
        let dir = runtime_dir();
        let desc = ScenarioLoader::read_description(dir.path()).unwrap();
        assert_eq!(desc.scenario_id, "TOY");
        assert_eq!(desc.performance_type, PerformanceType::Runtime);
        assert_eq!(desc.performance_measure.as_deref(), Some("runtime"));
        assert_eq!(desc.cutoff_time, Some(100.0));
        assert!(!desc.maximize);
        assert_eq!(
            desc.feature_steps,
            vec![
                ("basic".to_string(), vec![]),
                ("extra".to_string(), vec!["basic".to_string()]),
            ]
        );
    }

    #[test]
    fn test_feature_steps_keep_declaration_order() {
        let description = RUNTIME_DESCRIPTION.replace(
            "  basic:\n    provides: [f1]\n  extra:\n    requires: basic\n",
            "  zeta:\n    provides: [f1]\n  alpha:\n    requires: zeta\n",
        );
        let dir = write_dir(&[
            ("description.txt", description.as_str()),
            ("algorithm_runs.arff", RUNTIME_RUNS),
        ]);

        let desc = ScenarioLoader::read_description(dir.path()).unwrap();
        let names: Vec<&str> = desc.feature_steps.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);

        let data = ScenarioLoader::load(dir.path()).unwrap();
        assert_eq!(data.feature_steps(), ["zeta", "alpha"]);
        assert_eq!(data.feature_requires("alpha"), ["zeta"]);
    }

    #[test]
    fn test_load_runtime_scenario() {
        let dir = runtime_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();

        assert_eq!(data.scenario_id(), "TOY");
        assert_eq!(data.instances(), ["i1", "i2", "i3"]);
        assert_eq!(data.algorithms(), ["a1", "a2"]);
        assert_eq!(data.feature_steps(), ["basic", "extra"]);
        assert_eq!(data.feature_requires("extra"), ["basic"]);
        assert_eq!(data.cutoff_time(), Some(100.0));

        assert_eq!(data.performance("a1", "i1"), Some(10.0));
        assert_eq!(data.run_status("a1", "i1"), Some(&RunStatus::Ok));
        assert!(data.is_unsolvable("i3"));
        assert!(!data.is_unsolvable("i2"));
        assert_eq!(data.feature_cost("basic", "i2"), Some(3.0));
    }

    #[test]
    fn test_lowest_repetition_wins() {
        let dir = runtime_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        // repetition 2 (5.0) comes first in the file but repetition 1 is kept
        assert_eq!(data.performance("a2", "i2"), Some(20.0));
    }

    #[test]
    fn test_missing_runtime_becomes_cutoff() {
        let dir = runtime_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        assert_eq!(data.performance("a1", "i2"), Some(100.0));
        assert_eq!(data.run_status("a1", "i2"), Some(&RunStatus::Timeout));
    }

    #[test]
    fn test_load_quality_scenario_is_normalized() {
        let dir = quality_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();

        assert_eq!(data.performance_type(), PerformanceType::SolutionQuality);
        assert!(data.maximize());
        assert!(data.is_normalized());
        assert_eq!(data.cutoff_time(), None);
        assert_eq!(data.performance("a1", "q1"), Some(-5.0));
        assert_eq!(data.to_native(-5.0), 5.0);
        assert!(data.feature_steps().is_empty());
    }

    #[test]
    fn test_instance_ids_without_performance_data() {
        let dir = write_dir(&[("feature_runstatus.arff", FEATURE_RUNSTATUS)]);
        let ids = ScenarioLoader::read_instance_ids(dir.path()).unwrap();
        assert_eq!(ids, vec!["i1", "i2", "i3"]);
    }

    #[test]
    fn test_instance_ids_fall_back_to_runs() {
        let dir = quality_dir();
        let ids = ScenarioLoader::read_instance_ids(dir.path()).unwrap();
        assert_eq!(ids, vec!["q1", "q2"]);
    }

    #[test]
    fn test_instance_ids_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ScenarioLoader::read_instance_ids(dir.path()),
            Err(LoadError::NoInstances(_))
        ));
    }

    #[test]
    fn test_missing_description() {
        let dir = write_dir(&[("algorithm_runs.arff", RUNTIME_RUNS)]);
        assert!(matches!(
            ScenarioLoader::load(dir.path()),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn test_runtime_without_cutoff_rejected() {
        let description = RUNTIME_DESCRIPTION.replace(
            "algorithm_cutoff_time: 100",
            "algorithm_cutoff_time: '?'",
        );
        let dir = write_dir(&[
            ("description.txt", description.as_str()),
            ("algorithm_runs.arff", RUNTIME_RUNS),
        ]);
        assert!(matches!(
            ScenarioLoader::load(dir.path()),
            Err(LoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_incomplete_runs_rejected() {
        let runs = RUNTIME_RUNS.replace("i3,1,a2,100,crash\n", "");
        let dir = write_dir(&[
            ("description.txt", RUNTIME_DESCRIPTION),
            ("algorithm_runs.arff", runs.as_str()),
        ]);
        assert!(matches!(
            ScenarioLoader::load(dir.path()),
            Err(LoadError::Scenario(Error::InvalidScenario(_)))
        ));
    }
}

mod validation_tests {
    use super::*;
    use approx::assert_relative_eq;

    const SCHEDULES: &str = r#"{
        "i1": ["basic", ["a1", 50]],
        "i2": ["basic", ["a2", 100]],
        "i3": [["a1", 100]],
        "i9": [["a2", 10]]
    }"#;

    fn validate_toy(train: bool) -> ValidationReport {
        let dir = runtime_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        let schedules = read_schedules(schedules_file(dir.path(), SCHEDULES)).unwrap();
        Validator::default()
            .validate(
                PerformanceType::Runtime,
                &schedules,
                &data,
                train.then_some(&data as &dyn ScenarioData),
            )
            .unwrap()
    }

    #[test]
    fn test_end_to_end_runtime() {
        let report = validate_toy(false);

        // i1: 1 + 10, i2 presolved after 3, i3 unsolvable timeout removed
        assert_eq!(report.summary.instances, 2);
        assert_eq!(report.summary.solved, 2);
        assert_eq!(report.summary.timeouts, 0);
        assert_eq!(report.summary.unsolvable_removed, 1);
        assert_eq!(report.summary.presolved_during_features, 1);
        assert_relative_eq!(report.score, 7.0);
        assert!(report.baseline.is_none());

        assert!(report.diagnostics.iter().any(|d| {
            d.kind == DiagnosticKind::ExtraSchedule && d.instance.as_deref() == Some("i9")
        }));
    }

    #[test]
    fn test_end_to_end_with_baseline() {
        let report = validate_toy(true);
        let baseline = report.baseline.as_ref().unwrap();

        // a1 totals 2010 on the PAR10 scale, a2 totals 1070
        assert_eq!(baseline.sbs, "a2");
        // i3 is removed from the baselines along with the score
        assert_relative_eq!(baseline.oracle_score, 15.0);
        assert_relative_eq!(baseline.sbs_score, 35.0);
        // (70 - 14) / (70 - 30): feature presolving beats the oracle
        assert_relative_eq!(baseline.gap_closed.unwrap(), 1.4);
        assert_eq!(baseline.worse_than_sbs, 0);
    }

    #[test]
    fn test_missing_schedule_is_fatal() {
        let dir = runtime_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        let path = schedules_file(dir.path(), r#"{"i1": [["a1", 50]]}"#);
        let schedules = read_schedules(path).unwrap();
        let err = Validator::default()
            .validate_runtime(&schedules, &data, None)
            .unwrap_err();
        assert!(matches!(err, Error::MissingSchedules(ref m) if m.len() == 2));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_feature_step_before_prerequisite() {
        let dir = runtime_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        let json = r#"{"i1": ["extra", ["a1", 50]], "i2": [["a2", 100]], "i3": []}"#;
        let schedules = read_schedules(schedules_file(dir.path(), json)).unwrap();
        let report = Validator::default()
            .validate_runtime(&schedules, &data, None)
            .unwrap();

        let i1 = report.outcomes.iter().find(|o| o.instance == "i1").unwrap();
        assert!(i1.solved);
        assert_relative_eq!(i1.elapsed, 12.0);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::DataInconsistency));
    }

    #[test]
    fn test_quality_end_to_end() {
        let dir = quality_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        let json = r#"{"q1": [["a1", null]], "q2": ["a2"]}"#;
        let schedules = read_schedules(schedules_file(dir.path(), json)).unwrap();
        let report = Validator::default()
            .validate_quality(&schedules, &data, Some(&data))
            .unwrap();

        assert_relative_eq!(report.score, 4.5);
        assert_eq!(report.summary.solved, 2);
        assert_eq!(report.baseline.as_ref().unwrap().sbs, "a2");
    }

    #[test]
    fn test_quality_multi_entry_rejected() {
        let dir = quality_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        let json = r#"{"q1": ["a1", "a2"], "q2": ["a2"]}"#;
        let schedules = read_schedules(schedules_file(dir.path(), json)).unwrap();
        assert!(matches!(
            Validator::default().validate_quality(&schedules, &data, None),
            Err(Error::MultiEntryQualitySchedule { .. })
        ));
    }

    #[test]
    fn test_mode_mismatch() {
        let dir = quality_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        let path = schedules_file(dir.path(), r#"{"q1": ["a1"], "q2": ["a1"]}"#);
        let schedules = read_schedules(path).unwrap();
        assert!(matches!(
            Validator::default().validate_runtime(&schedules, &data, None),
            Err(Error::ModeMismatch { .. })
        ));
    }

    #[test]
    fn test_config_drives_validator() {
        let config =
            RunConfig::from_toml_str("[validation]\nremove_unsolvable = false\nparallel = false\n")
                .unwrap();
        let dir = runtime_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        let schedules = read_schedules(schedules_file(dir.path(), SCHEDULES)).unwrap();
        let report = Validator::new(config.validator_config())
            .validate_runtime(&schedules, &data, None)
            .unwrap();

        // (11 + 3 + 1000) / 3 with the unsolvable timeout kept
        assert_eq!(report.summary.instances, 3);
        assert_relative_eq!(report.score, 1014.0 / 3.0);
    }
}

mod output_tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_best_schedule_file() {
        let dir = runtime_dir();
        let train = ScenarioLoader::load(dir.path()).unwrap();
        let instances = ScenarioLoader::read_instance_ids(dir.path()).unwrap();

        let single_best = SingleBest::fit(&train).unwrap();
        assert_eq!(single_best.algorithm, "a2");

        let path = dir.path().join("sbs.json");
        write_schedules(&path, &single_best.predict(&instances)).unwrap();
        let schedules: ScheduleSet = read_schedules(&path).unwrap();
        assert_eq!(schedules.len(), 3);

        let report = Validator::default()
            .validate_runtime(&schedules, &train, Some(&train))
            .unwrap();
        // 50 + 20 over two instances, i3 removed as unsolvable
        assert_relative_eq!(report.score, 35.0);
        assert_relative_eq!(report.baseline.as_ref().unwrap().gap_closed.unwrap(), 0.0);
    }

    #[test]
    fn test_report_files() {
        let dir = runtime_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        let json = r#"{"i1": [["a1", 100]], "i2": [["a2", 100]], "i3": [["a2", 100]]}"#;
        let schedules = read_schedules(schedules_file(dir.path(), json)).unwrap();
        let report = Validator::default()
            .validate_runtime(&schedules, &data, Some(&data))
            .unwrap();

        let json_path = dir.path().join("report.json");
        report.save_json(&json_path).unwrap();
        let loaded = ValidationReport::load_json(&json_path).unwrap();
        assert_eq!(loaded.scenario, report.scenario);
        assert_eq!(loaded.summary, report.summary);
        assert_relative_eq!(loaded.score, report.score);

        let csv_path = dir.path().join("outcomes.csv");
        save_outcomes_csv(&report, &csv_path).unwrap();
        let csv = fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("instance,solved,elapsed"));
        assert!(lines[1].starts_with("i1,true,10.0000,10.0000"));

        assert!(summary_line(&report).starts_with("TOY: score="));
    }

    #[test]
    fn test_compare_saved_reports() {
        let dir = runtime_dir();
        let data = ScenarioLoader::load(dir.path()).unwrap();
        let run = |json: &str, name: &str| {
            let schedules = read_schedules(schedules_file(dir.path(), json)).unwrap();
            let report = Validator::default()
                .validate_runtime(&schedules, &data, Some(&data))
                .unwrap();
            let path = dir.path().join(name);
            report.save_json(&path).unwrap();
            path
        };
        let good = run(
            r#"{"i1": [["a1", 100]], "i2": ["basic"], "i3": []}"#,
            "good.json",
        );
        let bad = run(
            r#"{"i1": [["a2", 100]], "i2": [["a1", 100]], "i3": []}"#,
            "bad.json",
        );

        let mut comparison = Comparison::new();
        comparison.load_json(&bad).unwrap();
        comparison.load_json(&good).unwrap();
        assert_eq!(comparison.len(), 2);

        let result = comparison.analyze();
        assert_eq!(result.rankings.by_score[0].system, "good");
        assert_eq!(result.rankings.by_score[1].system, "bad");
    }
}
