//! ASlib scenario directory loader.
//!
//! Reads `description.txt`, `algorithm_runs.arff` and, for runtime
//! scenarios, the optional `feature_costs.arff` and `feature_runstatus.arff`
//! into normalized [`ScenarioTables`].

use crate::arff::{ArffError, ArffFile};
use aslib_validate_core::{
    FeatureStatus, PerformanceType, RunStatus, ScenarioBuilder, ScenarioData, ScenarioTables,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DESCRIPTION_FILE: &str = "description.txt";
pub const ALGORITHM_RUNS_FILE: &str = "algorithm_runs.arff";
pub const FEATURE_COSTS_FILE: &str = "feature_costs.arff";
pub const FEATURE_RUNSTATUS_FILE: &str = "feature_runstatus.arff";
pub const FEATURE_VALUES_FILE: &str = "feature_values.arff";

/// Errors that can occur while loading a scenario directory.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid description.txt: {0}")]
    Description(#[from] serde_yaml::Error),

    #[error("{file}: {source}")]
    Arff {
        file: String,
        #[source]
        source: ArffError,
    },

    #[error("{file}: {message}")]
    InvalidValue { file: String, message: String },

    #[error("no file listing instances in {0}")]
    NoInstances(PathBuf),

    #[error(transparent)]
    Scenario(#[from] aslib_validate_core::Error),
}

/// Accepts both `key: value` and `key: [value, ...]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(v) => Some(v),
            OneOrMany::Many(vs) => vs.first(),
        }
    }

    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}

/// Feature step entry: either a plain feature list or a map with
/// `requires`/`provides`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FeatureStepDecl {
    Features(Vec<String>),
    Detailed {
        #[serde(default)]
        requires: Option<OneOrMany<String>>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct RawDescription {
    scenario_id: String,
    #[serde(default)]
    performance_measures: OneOrMany<String>,
    performance_type: OneOrMany<String>,
    #[serde(default)]
    maximize: OneOrMany<bool>,
    #[serde(default)]
    algorithm_cutoff_time: Option<serde_yaml::Value>,
    /// Kept as a mapping so steps come out in declaration order.
    #[serde(default)]
    feature_steps: serde_yaml::Mapping,
}

/// The parts of `description.txt` the validator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioDescription {
    pub scenario_id: String,
    pub performance_type: PerformanceType,
    /// First performance measure, if named.
    pub performance_measure: Option<String>,
    pub maximize: bool,
    pub cutoff_time: Option<f64>,
    /// Feature step names with their prerequisites.
    pub feature_steps: Vec<(String, Vec<String>)>,
}

impl ScenarioDescription {
    /// Parses the YAML content of `description.txt`.
    pub fn parse(yaml: &str) -> Result<Self, LoadError> {
        let raw: RawDescription = serde_yaml::from_str(yaml)?;
        let invalid = |message: String| LoadError::InvalidValue {
            file: DESCRIPTION_FILE.to_string(),
            message,
        };

        let performance_type = raw
            .performance_type
            .first()
            .ok_or_else(|| invalid("performance_type is empty".to_string()))?
            .parse::<PerformanceType>()?;
        // `?` in YAML reads as a string and means "no cutoff".
        let cutoff_time = raw.algorithm_cutoff_time.as_ref().and_then(serde_yaml::Value::as_f64);

        let mut feature_steps = Vec::with_capacity(raw.feature_steps.len());
        for (key, value) in raw.feature_steps {
            let name = key
                .as_str()
                .ok_or_else(|| invalid(format!("feature step name {:?} is not a string", key)))?
                .to_string();
            let requires = match serde_yaml::from_value::<FeatureStepDecl>(value)? {
                FeatureStepDecl::Features(_) => Vec::new(),
                FeatureStepDecl::Detailed { requires } => {
                    requires.map(OneOrMany::into_vec).unwrap_or_default()
                }
            };
            feature_steps.push((name, requires));
        }

        Ok(Self {
            scenario_id: raw.scenario_id,
            performance_type,
            performance_measure: raw.performance_measures.first().cloned(),
            maximize: raw.maximize.first().copied().unwrap_or(false),
            cutoff_time,
            feature_steps,
        })
    }
}

/// Loads ASlib scenario directories.
pub struct ScenarioLoader;

impl ScenarioLoader {
    /// Reads `description.txt` of a scenario directory.
    pub fn read_description(dir: impl AsRef<Path>) -> Result<ScenarioDescription, LoadError> {
        let path = dir.as_ref().join(DESCRIPTION_FILE);
        let content = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        ScenarioDescription::parse(&content)
    }

    /// Loads a full scenario and returns normalized tables.
    pub fn load(dir: impl AsRef<Path>) -> Result<ScenarioTables, LoadError> {
        let dir = dir.as_ref();
        let desc = Self::read_description(dir)?;
        log::info!(
            "Loading scenario '{}' ({}) from {}",
            desc.scenario_id,
            desc.performance_type,
            dir.display()
        );

        let mut builder = match desc.performance_type {
            PerformanceType::Runtime => {
                let cutoff = desc.cutoff_time.ok_or_else(|| LoadError::InvalidValue {
                    file: DESCRIPTION_FILE.to_string(),
                    message: "runtime scenario without algorithm_cutoff_time".to_string(),
                })?;
                ScenarioBuilder::runtime(&desc.scenario_id, cutoff)
            }
            PerformanceType::SolutionQuality => {
                ScenarioBuilder::quality(&desc.scenario_id, desc.maximize)
            }
        };

        builder = Self::read_runs(dir, &desc, builder)?;
        if desc.performance_type == PerformanceType::Runtime && !desc.feature_steps.is_empty() {
            builder = Self::read_features(dir, &desc, builder)?;
        }

        let tables = builder.build()?.normalized();
        log::info!(
            "Loaded {} instances, {} algorithms",
            tables.instances().len(),
            tables.algorithms().len()
        );
        Ok(tables)
    }

    /// Instance names of a (possibly partial) scenario directory.
    ///
    /// Looks at feature values first, then feature run status, then
    /// algorithm runs, so test splits without performance data work too.
    pub fn read_instance_ids(dir: impl AsRef<Path>) -> Result<Vec<String>, LoadError> {
        let dir = dir.as_ref();
        for file in [FEATURE_VALUES_FILE, FEATURE_RUNSTATUS_FILE, ALGORITHM_RUNS_FILE] {
            let path = dir.join(file);
            if !path.exists() {
                continue;
            }
            let arff = read_arff(&path, file)?;
            let col = arff.require_column("instance_id").map_err(|e| arff_error(file, e))?;
            let mut ids: Vec<String> = Vec::new();
            for row in 0..arff.rows.len() {
                if let Some(id) = arff.value(row, col) {
                    if !ids.iter().any(|i| i == id) {
                        ids.push(id.to_string());
                    }
                }
            }
            return Ok(ids);
        }
        Err(LoadError::NoInstances(dir.to_path_buf()))
    }

    fn read_runs(
        dir: &Path,
        desc: &ScenarioDescription,
        mut builder: ScenarioBuilder,
    ) -> Result<ScenarioBuilder, LoadError> {
        let file = ALGORITHM_RUNS_FILE;
        let arff = read_arff(&dir.join(file), file)?;
        let inst_col = arff.require_column("instance_id").map_err(|e| arff_error(file, e))?;
        let algo_col = arff.require_column("algorithm").map_err(|e| arff_error(file, e))?;
        let rep_col = arff.column("repetition");
        let perf_col = match &desc.performance_measure {
            Some(measure) => arff.require_column(measure).map_err(|e| arff_error(file, e))?,
            None => 3,
        };
        let status_col = arff.column("runstatus");
        let runtime = desc.performance_type == PerformanceType::Runtime;
        if runtime && status_col.is_none() {
            return Err(arff_error(file, ArffError::MissingColumn("runstatus".to_string())));
        }

        // (algorithm, instance) -> (repetition, value, status)
        let mut cells: HashMap<(String, String), (f64, f64, RunStatus)> = HashMap::new();
        let mut order: Vec<(String, String)> = Vec::new();
        for row in 0..arff.rows.len() {
            let (Some(inst), Some(algo)) = (arff.value(row, inst_col), arff.value(row, algo_col))
            else {
                return Err(invalid(file, format!("row {} lacks instance or algorithm", row)));
            };
            let rep = match rep_col {
                Some(c) => arff.number(row, c).map_err(|e| arff_error(file, e))?.unwrap_or(1.0),
                None => 1.0,
            };
            let status = status_col
                .and_then(|c| arff.value(row, c))
                .map_or(RunStatus::Ok, |s| s.parse().unwrap_or(RunStatus::Other));
            let value = match arff.number(row, perf_col).map_err(|e| arff_error(file, e))? {
                Some(v) => v,
                None if runtime => desc.cutoff_time.unwrap_or_default(),
                None => {
                    return Err(invalid(
                        file,
                        format!("missing performance of {} on {}", algo, inst),
                    ))
                }
            };

            let key = (algo.to_string(), inst.to_string());
            let replace = cells.get(&key).map_or(true, |(seen, _, _)| rep < *seen);
            if !cells.contains_key(&key) {
                order.push(key.clone());
            }
            if replace {
                cells.insert(key, (rep, value, status));
            } else {
                log::debug!("Ignoring repetition {} of {} on {}", rep, algo, inst);
            }
        }

        for key in order {
            if let Some((_, value, status)) = cells.remove(&key) {
                let (algo, inst) = key;
                builder = if runtime {
                    builder.run(&algo, &inst, value, status)
                } else {
                    builder.performance(&algo, &inst, value)
                };
            }
        }
        Ok(builder)
    }

    fn read_features(
        dir: &Path,
        desc: &ScenarioDescription,
        mut builder: ScenarioBuilder,
    ) -> Result<ScenarioBuilder, LoadError> {
        for (step, requires) in &desc.feature_steps {
            let reqs: Vec<&str> = requires.iter().map(String::as_str).collect();
            builder = builder.feature_step(step, &reqs);
        }

        let costs = Self::read_step_table(dir, FEATURE_COSTS_FILE, desc, |arff, row, col| {
            arff.number(row, col)
                .map_err(|e| arff_error(FEATURE_COSTS_FILE, e))
                .map(|v| v.map(StepCell::Cost))
        })?;
        let statuses = Self::read_step_table(dir, FEATURE_RUNSTATUS_FILE, desc, |arff, row, col| {
            Ok(arff
                .value(row, col)
                .map(|s| StepCell::Status(s.parse().unwrap_or(FeatureStatus::Other))))
        })?;

        if costs.is_empty() {
            log::warn!("No {} found, feature steps are free", FEATURE_COSTS_FILE);
        }

        let instances = builder.instances().to_vec();
        for inst in &instances {
            for (step, _) in &desc.feature_steps {
                let key = (step.clone(), inst.clone());
                let cost = match costs.get(&key) {
                    Some((_, StepCell::Cost(c))) => Some(*c),
                    _ => None,
                };
                let status = match statuses.get(&key) {
                    Some((_, StepCell::Status(s))) => s.clone(),
                    _ => FeatureStatus::Ok,
                };
                builder = builder.feature(step, inst, cost, status);
            }
        }
        Ok(builder)
    }

    /// Reads a per-step table keyed by (step, instance); the lowest
    /// repetition wins.
    fn read_step_table<F>(
        dir: &Path,
        file: &str,
        desc: &ScenarioDescription,
        cell: F,
    ) -> Result<HashMap<(String, String), (f64, StepCell)>, LoadError>
    where
        F: Fn(&ArffFile, usize, usize) -> Result<Option<StepCell>, LoadError>,
    {
        let path = dir.join(file);
        let mut table = HashMap::new();
        if !path.exists() {
            return Ok(table);
        }
        let arff = read_arff(&path, file)?;
        let inst_col = arff.require_column("instance_id").map_err(|e| arff_error(file, e))?;
        let rep_col = arff.column("repetition");

        for (step, _) in &desc.feature_steps {
            let Some(col) = arff.column(step) else {
                log::warn!("{} has no column for feature step '{}'", file, step);
                continue;
            };
            for row in 0..arff.rows.len() {
                let Some(inst) = arff.value(row, inst_col) else {
                    continue;
                };
                let rep = match rep_col {
                    Some(c) => arff.number(row, c).map_err(|e| arff_error(file, e))?,
                    None => None,
                }
                .unwrap_or(1.0);
                let key = (step.clone(), inst.to_string());
                if table.get(&key).map_or(false, |(seen, _)| *seen <= rep) {
                    continue;
                }
                if let Some(value) = cell(&arff, row, col)? {
                    table.insert(key, (rep, value));
                }
            }
        }
        Ok(table)
    }
}

#[derive(Debug, Clone)]
enum StepCell {
    Cost(f64),
    Status(FeatureStatus),
}

fn read_arff(path: &Path, file: &str) -> Result<ArffFile, LoadError> {
    log::debug!("Reading {}", path.display());
    ArffFile::read(path).map_err(|e| arff_error(file, e))
}

fn arff_error(file: &str, source: ArffError) -> LoadError {
    LoadError::Arff {
        file: file.to_string(),
        source,
    }
}

fn invalid(file: &str, message: String) -> LoadError {
    LoadError::InvalidValue {
        file: file.to_string(),
        message,
    }
}
