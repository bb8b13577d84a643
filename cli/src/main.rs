use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use engn_check::{CheckOptions, Report, check, load_registry};
use engn_core::{Presence, Property};
use engn_store::{CheckPolicy, ProjectConfig};
use tracing::debug;

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "engn")]
#[command(about = "Structural and referential checks for engn JSONL data")]
#[command(version)]
struct Cli {
    /// Log debug details to stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a file or directory (default: the project in the working directory).
    Check(CheckArgs),
    /// Print the flattened property list of a type.
    Resolve(ResolveArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// File or directory to check.
    target: Option<PathBuf>,

    /// Check policy YAML file (default: .engn-check.yml if present).
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value = "text")]
    format: CliOutputFormat,

    /// Worker threads for scanning.
    #[arg(long)]
    jobs: Option<usize>,

    /// Report repeated reference target values.
    #[arg(long)]
    unique_refs: bool,

    /// Accept fields a type does not declare.
    #[arg(long)]
    allow_unknown_fields: bool,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// Type name.
    type_name: String,

    /// File or directory holding the definitions (default: the project).
    target: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(cli.quiet, cli.verbose) {
        eprintln!("error: {err}");
        std::process::exit(2);
    }

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Resolve(args) => run_resolve(args).map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<(), String> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("ENGN_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| format!("failed to initialize tracing subscriber: {err}"))
}

/// Returns `Ok(true)` when the data is clean.
fn run_check(args: CheckArgs) -> Result<bool, String> {
    let working_dir = current_dir()?;

    let mut policy = match &args.policy {
        Some(path) => CheckPolicy::load(path)
            .map_err(|err| format!("Failed to load policy '{}': {err}", path.display()))?,
        None => CheckPolicy::discover(&working_dir).map_err(|err| err.to_string())?,
    };
    if args.jobs.is_some() {
        policy.jobs = args.jobs;
    }
    policy.unique_reference_targets |= args.unique_refs;
    policy.allow_unknown_fields |= args.allow_unknown_fields;

    let options = build_options(&working_dir, args.target, policy)?;
    debug!(targets = ?options.targets, "checking");
    let report = check(options).map_err(|err| err.to_string())?;

    print_report(&report, args.format)?;
    Ok(report.is_success())
}

fn run_resolve(args: ResolveArgs) -> Result<(), String> {
    let working_dir = current_dir()?;
    let options = build_options(&working_dir, args.target, CheckPolicy::default())?;
    let registry = load_registry(options).map_err(|err| err.to_string())?;

    let properties = registry
        .resolve(&args.type_name)
        .map_err(|err| err.to_string())?;

    println!("{}", args.type_name);
    for property in &properties {
        println!("  {}", describe_property(property));
    }
    Ok(())
}

fn build_options(
    working_dir: &Path,
    target: Option<PathBuf>,
    policy: CheckPolicy,
) -> Result<CheckOptions, String> {
    match target {
        Some(target) => Ok(CheckOptions::new(vec![target], policy)),
        None => {
            let project = ProjectConfig::load(working_dir).map_err(|err| err.to_string())?;
            Ok(CheckOptions::for_project(working_dir, project.as_ref(), policy))
        }
    }
}

fn print_report(report: &Report, format: CliOutputFormat) -> Result<(), String> {
    match format {
        CliOutputFormat::Text => print!("{}", report.render_text()),
        CliOutputFormat::Json => {
            let json = report
                .to_json()
                .map_err(|err| format!("Failed to serialize report: {err}"))?;
            println!("{json}");
        }
    }
    Ok(())
}

fn describe_property(property: &Property) -> String {
    let presence = match property.presence {
        Presence::Required => "required",
        Presence::Optional => "optional",
    };
    match &property.default {
        Some(default) => format!(
            "{}: {} ({presence}, default {default})",
            property.name, property.type_ref
        ),
        None => format!("{}: {} ({presence})", property.name, property.type_ref),
    }
}

fn current_dir() -> Result<PathBuf, String> {
    std::env::current_dir().map_err(|err| format!("Failed to read working directory: {err}"))
}
