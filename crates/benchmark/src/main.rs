//! Algorithm selection schedule validator CLI

use anyhow::Context;
use aslib_validate_core::{PerformanceType, ScenarioData, Validator};
use aslib_validate_benchmark::{
    read_schedules, save_outcomes_csv, summary_line, write_schedules, Comparison, ReportGenerator,
    RunConfig, ScenarioLoader, SingleBest,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "validate-runner")]
#[command(about = "Validates algorithm selection schedules against ASlib scenarios")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay and score a result file on a test scenario
    Validate {
        /// Result JSON file with a schedule for each test instance
        #[arg(long)]
        result_fn: PathBuf,

        /// Directory with *all* test data in ASlib format
        #[arg(long)]
        test_as: PathBuf,

        /// Directory with training data, enables oracle/SBS baselines
        #[arg(long)]
        train_as: Option<PathBuf>,

        /// Validation mode (defaults to the scenario's performance type)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Keep unsolvable instances in the runtime averages
        #[arg(long)]
        keep_unsolvable: bool,

        /// Replay instances on the calling thread
        #[arg(long)]
        sequential: bool,

        /// Worker threads (0 = all cores)
        #[arg(long)]
        threads: Option<usize>,

        /// Output file for the report (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file for the report (Markdown)
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Output file for per-instance outcomes (CSV)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// TOML run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a result file that always selects the single best solver
    SingleBest {
        /// Directory with training data in ASlib format
        #[arg(long)]
        train_as: PathBuf,

        /// Directory with test data (performance data may be missing)
        #[arg(long)]
        test_as: PathBuf,

        /// Output result file
        #[arg(short, long, default_value = "results.json")]
        output: PathBuf,
    },

    /// Compare saved validation reports
    Compare {
        /// Report JSON files, one per system
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Output file for the comparison (Markdown)
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Output file for the comparison (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Runtime schedules scored by PAR10
    Runtime,
    /// Single-algorithm selections scored by solution quality
    Quality,
}

impl From<ModeArg> for PerformanceType {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Runtime => PerformanceType::Runtime,
            ModeArg::Quality => PerformanceType::SolutionQuality,
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Also installs the `log` bridge, so library records reach the subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli.command) {
        eprintln!("Error: {:#}", err);
        let contract = err
            .downcast_ref::<aslib_validate_core::Error>()
            .map_or(false, |e| e.is_contract_violation());
        std::process::exit(if contract { 2 } else { 1 });
    }
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Validate {
            result_fn,
            test_as,
            train_as,
            mode,
            keep_unsolvable,
            sequential,
            threads,
            output,
            markdown,
            csv,
            config,
        } => {
            let mut run_config = match &config {
                Some(path) => RunConfig::from_toml_file(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => RunConfig::default(),
            };
            if keep_unsolvable {
                run_config.validation.remove_unsolvable = false;
            }
            if sequential {
                run_config.validation.parallel = false;
            }
            if let Some(t) = threads {
                run_config.validation.threads = t;
            }
            let output = output.or(run_config.output.json.clone());
            let markdown = markdown.or(run_config.output.markdown.clone());
            let csv = csv.or(run_config.output.csv.clone());

            let test = ScenarioLoader::load(&test_as)
                .with_context(|| format!("loading test scenario {}", test_as.display()))?;
            let train = match &train_as {
                Some(dir) => Some(
                    ScenarioLoader::load(dir)
                        .with_context(|| format!("loading training scenario {}", dir.display()))?,
                ),
                None => None,
            };
            let schedules = read_schedules(&result_fn)?;

            let mode = mode.map_or(test.performance_type(), Into::into);
            let validator = Validator::new(run_config.validator_config());
            let report = validator.validate(
                mode,
                &schedules,
                &test,
                train.as_ref().map(|t| t as &dyn ScenarioData),
            )?;

            if run_config.output.print_summary {
                report.print_summary();
            }
            println!("{}", summary_line(&report));

            if let Some(path) = output {
                report.save_json(&path)?;
                println!("Report saved to: {}", path.display());
            }
            if let Some(path) = markdown {
                std::fs::write(&path, report.to_markdown())?;
                println!("Markdown report saved to: {}", path.display());
            }
            if let Some(path) = csv {
                save_outcomes_csv(&report, &path)?;
                println!("CSV saved to: {}", path.display());
            }
        }

        Commands::SingleBest {
            train_as,
            test_as,
            output,
        } => {
            let train = ScenarioLoader::load(&train_as)
                .with_context(|| format!("loading training scenario {}", train_as.display()))?;
            let instances = ScenarioLoader::read_instance_ids(&test_as)?;

            let single_best = SingleBest::fit(&train)?;
            let schedules = single_best.predict(&instances);
            write_schedules(&output, &schedules)?;

            println!(
                "Selected {} for {} test instances",
                single_best.algorithm,
                schedules.len()
            );
            println!("Results saved to: {}", output.display());
        }

        Commands::Compare {
            reports,
            markdown,
            output,
        } => {
            let mut comparison = Comparison::new();
            for path in &reports {
                comparison
                    .load_json(path)
                    .with_context(|| format!("loading report {}", path.display()))?;
            }
            let report = comparison.analyze();

            println!("\n{} ({})", report.title, report.scenario);
            println!("{:-<60}", "");
            for r in &report.rankings.by_score {
                println!("  {:>2}. {:<30} {:>12.4}", r.rank, r.system, r.value);
            }

            if let Some(path) = markdown {
                ReportGenerator::save_markdown(&report, &path)?;
                println!("Markdown report saved to: {}", path.display());
            }
            if let Some(path) = output {
                ReportGenerator::save_json(&report, &path)?;
                println!("Comparison saved to: {}", path.display());
            }
        }
    }

    Ok(())
}
