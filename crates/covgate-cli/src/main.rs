//! covgate - diff-scoped coverage gate CLI
//!
//! The `covgate` command decides whether the lines a change touches were
//! executed by the test suite.
//!
//! ## Commands
//!
//! - `run`: evaluate one or more partitions and exit 0 (pass), 1 (coverage
//!   below threshold) or 2 (hard error)
//! - `changed`: print the changed-line set for a base ref as JSON
//! - `inspect`: summarize what a coverage report instruments

use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use covgate_ci::{GateConfig, GateOrchestrator, PartitionConfig, Regenerate};
use covgate_core::{
    capture_head_sha, render_gate_summary, render_partition_report, write_gate_artifact,
    CovgateError, DiffExtractor, DiffFailurePolicy, DiffSource, GateArtifact, PathRules,
    RenderOptions, ReportFormat, EXIT_HARD_ERROR,
};

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

const DEFAULT_CONFIG_FILE: &str = "covgate.toml";

#[derive(Parser)]
#[command(name = "covgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Diff-scoped coverage gate", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate diff coverage for every partition and gate on the result
    Run(RunArgs),

    /// Print the changed lines for a base ref as JSON
    Changed {
        /// Base branch to diff against
        #[arg(short, long, default_value = "main")]
        base: String,

        /// Repository root
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Read a unified diff from this file (`-` for stdin) instead of git
        #[arg(long)]
        diff_file: Option<PathBuf>,

        /// What to do when no diff strategy succeeds (error|empty)
        #[arg(long, env = "COVGATE_ON_DIFF_FAILURE")]
        on_diff_failure: Option<DiffFailurePolicy>,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Summarize the lines a coverage report instruments and executes
    Inspect {
        /// Report format (lcov|coverage_py|istanbul)
        #[arg(short, long)]
        format: ReportFormat,

        /// Path to the report
        report: PathBuf,

        #[command(flatten)]
        paths: PathArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Gate configuration file (default: ./covgate.toml when present)
    #[arg(short, long, env = "COVGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Partition name; with --config, run only this partition
    #[arg(short, long)]
    name: Option<String>,

    /// Report format for a partition defined on the command line
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Coverage report path (default: the format's conventional location)
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Base branch to diff against (overrides every partition)
    #[arg(short, long, env = "COVGATE_BASE")]
    base: Option<String>,

    /// Minimum diff coverage percentage (overrides every partition)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Run the test command before reading the report (overrides every partition)
    #[arg(long)]
    regenerate: bool,

    /// Run the test command only when the report is missing
    #[arg(long, conflicts_with = "regenerate")]
    generate_missing: bool,

    /// Test command for a partition defined on the command line
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_terminator = ";")]
    test_command: Option<Vec<String>>,

    /// Repository root (default: the config file's directory, else `.`)
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Read a unified diff from this file (`-` for stdin) instead of git
    #[arg(long)]
    diff_file: Option<PathBuf>,

    /// What to do when no diff strategy succeeds (error|empty)
    #[arg(long, env = "COVGATE_ON_DIFF_FAILURE")]
    on_diff_failure: Option<DiffFailurePolicy>,

    /// Evaluate partitions concurrently
    #[arg(long)]
    parallel: bool,

    /// Write covgate.json and covgate.digest into this directory
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Missing line numbers listed per file
    #[arg(long, default_value = "10")]
    max_missing: usize,

    #[command(flatten)]
    paths: PathArgs,
}

/// Path rules for a partition defined on the command line.
#[derive(Args, Default)]
struct PathArgs {
    /// Only consider paths under this prefix (repeatable)
    #[arg(long = "include")]
    include: Vec<String>,

    /// Strip this prefix before matching report paths (repeatable)
    #[arg(long = "strip-prefix")]
    strip_prefix: Vec<String>,

    /// Source file extension without the dot (repeatable; `*` for any)
    #[arg(long = "extension")]
    extension: Vec<String>,
}

impl PathArgs {
    fn is_empty(&self) -> bool {
        self.include.is_empty() && self.strip_prefix.is_empty() && self.extension.is_empty()
    }

    fn to_rules(&self) -> PathRules {
        let mut rules = PathRules::default();
        rules.include = self.include.clone();
        rules.strip_prefixes = self.strip_prefix.clone();
        rules.extensions = self
            .extension
            .iter()
            .filter(|e| e.as_str() != "*")
            .map(|e| e.trim_start_matches('.').to_string())
            .collect();
        rules
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    covgate_core::init_tracing(cli.json, level);

    tokio::select! {
        outcome = dispatch(cli.command) => match outcome {
            Ok(code) => ExitCode::from(code),
            Err(err) => {
                eprintln!("error: {err:#}");
                ExitCode::from(hard_error_code(&err))
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

fn hard_error_code(err: &anyhow::Error) -> u8 {
    let code = err
        .downcast_ref::<CovgateError>()
        .map(CovgateError::exit_code)
        .unwrap_or(EXIT_HARD_ERROR);
    u8::try_from(code).unwrap_or(2)
}

async fn dispatch(command: Commands) -> Result<u8> {
    match command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Changed {
            base,
            repo,
            diff_file,
            on_diff_failure,
            paths,
        } => cmd_changed(&base, &repo, diff_file.as_deref(), on_diff_failure, &paths),
        Commands::Inspect {
            format,
            report,
            paths,
        } => cmd_inspect(format, &report, &paths),
    }
}

/// Read diff text from a file, or stdin for `-`.
fn read_diff_file(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read diff from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read diff file {}", path.display()))
    }
}

/// Flags that only describe a command-line partition.
fn partition_definition_flags(args: &RunArgs) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if args.format.is_some() {
        flags.push("--format");
    }
    if args.report.is_some() {
        flags.push("--report");
    }
    if args.test_command.is_some() {
        flags.push("--test-command");
    }
    if !args.paths.is_empty() {
        flags.push("--include/--strip-prefix/--extension");
    }
    flags
}

/// Build the gate configuration from a config file and/or flags.
fn build_gate_config(args: &RunArgs) -> Result<GateConfig> {
    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None if args.format.is_none() && Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            Some(PathBuf::from(DEFAULT_CONFIG_FILE))
        }
        None => None,
    };

    let mut config = match config_path {
        Some(path) => {
            let flags = partition_definition_flags(args);
            if !flags.is_empty() {
                return Err(CovgateError::InvalidConfig(format!(
                    "{} define a partition on the command line and cannot be combined with {}",
                    flags.join("/"),
                    path.display()
                ))
                .into());
            }
            let mut config = GateConfig::from_toml_file(&path)?;
            if let Some(name) = &args.name {
                config.partitions.retain(|p| &p.name == name);
                if config.partitions.is_empty() {
                    return Err(CovgateError::InvalidConfig(format!(
                        "no partition named '{name}' in {}",
                        path.display()
                    ))
                    .into());
                }
            }
            config
        }
        None => {
            let format = args.format.ok_or_else(|| {
                CovgateError::InvalidConfig(format!(
                    "either --config, ./{DEFAULT_CONFIG_FILE} or --format is required"
                ))
            })?;
            let mut partition = PartitionConfig::new(
                args.name.clone().unwrap_or_else(|| "default".to_string()),
                format,
            )
            .with_paths(args.paths.to_rules());
            if args.paths.extension.iter().any(|e| e == "*") {
                partition.paths.extensions = vec!["*".to_string()];
            }
            partition.report = args.report.clone();
            partition.test_command = args.test_command.clone();
            GateConfig::new(".", vec![partition])
        }
    };

    if let Some(repo) = &args.repo {
        config.repo_root = repo.clone();
    }
    if let Some(policy) = args.on_diff_failure {
        config.on_diff_failure = Some(policy);
    }
    config.parallel |= args.parallel;

    for partition in &mut config.partitions {
        if let Some(base) = &args.base {
            partition.base_ref = base.clone();
        }
        if let Some(threshold) = args.threshold {
            partition.threshold = threshold;
        }
        if args.regenerate {
            partition.regenerate = Regenerate::Always;
        } else if args.generate_missing {
            partition.regenerate = Regenerate::IfMissing;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Evaluate every partition and print reports
async fn cmd_run(args: RunArgs) -> Result<u8> {
    let config = build_gate_config(&args)?;
    let repo_root = config.repo_root.clone();

    let mut gate = GateOrchestrator::new(config);
    if let Some(path) = &args.diff_file {
        gate = gate.with_diff_source(DiffSource::Text(read_diff_file(path)?));
    }

    let result = gate.run().await?;

    let opts = RenderOptions {
        max_missing: args.max_missing,
    };
    for verdict in &result.partitions {
        print!("{}", render_partition_report(verdict, &opts));
        println!();
    }
    print!("{}", render_gate_summary(&result));

    if let Some(dir) = &args.json_out {
        let head_sha = capture_head_sha(&repo_root).ok();
        let artifact = GateArtifact::new(result.clone(), head_sha);
        let path = write_gate_artifact(&artifact, dir)
            .with_context(|| format!("Failed to write gate artifact to {}", dir.display()))?;
        info!(artifact = %path.display(), "gate artifact written");
    }

    Ok(u8::try_from(result.exit_code()).unwrap_or(1))
}

/// Print changed lines as JSON
fn cmd_changed(
    base: &str,
    repo: &Path,
    diff_file: Option<&Path>,
    on_diff_failure: Option<DiffFailurePolicy>,
    paths: &PathArgs,
) -> Result<u8> {
    let policy = on_diff_failure.unwrap_or_else(DiffFailurePolicy::from_env);
    let mut extractor = DiffExtractor::new(repo, policy);
    if let Some(path) = diff_file {
        extractor = extractor.with_source(DiffSource::Text(read_diff_file(path)?));
    }

    let changed = extractor.extract_changed_lines(base, &paths.to_rules())?;
    println!("{}", serde_json::to_string_pretty(&changed)?);
    Ok(0)
}

#[derive(Serialize)]
struct InspectRow<'a> {
    path: &'a str,
    instrumented: usize,
    executed: usize,
}

/// Summarize a coverage report
fn cmd_inspect(format: ReportFormat, report: &Path, paths: &PathArgs) -> Result<u8> {
    let coverage = format
        .ingester()
        .parse_report(report, &paths.to_rules())?;

    let rows: Vec<InspectRow> = coverage
        .paths()
        .filter_map(|path| {
            coverage.stats(path).map(|stats| InspectRow {
                path,
                instrumented: stats.instrumented,
                executed: stats.executed,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(0)
}
