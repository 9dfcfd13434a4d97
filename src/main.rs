//! dashqc: Dashboard quality-control CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dashqc::audit::AuditEngine;
use dashqc::config::{load_config, starter_config, CONFIG_FILENAME};
use dashqc::history::{
    append_run, format_delta, history_dir, load_history, previous_failed, save_history,
};
use dashqc::reporter::{ConsoleReporter, JsonReporter};
use dashqc::Status;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// dashqc: Quality control for CSV-driven student performance dashboards
#[derive(Parser, Debug)]
#[command(name = "dashqc")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// CSV dataset to audit (may also come from config)
    path: Option<PathBuf>,

    /// Rendered dashboard document to check for structural markers
    #[arg(long, short)]
    report: Option<PathBuf>,

    /// Output format as JSON
    #[arg(long, short)]
    json: bool,

    /// Quiet mode (one summary line)
    #[arg(long, short)]
    quiet: bool,

    /// Verbose output (include the derived aggregates)
    #[arg(long, short)]
    verbose: bool,

    /// Exit 1 if any check fails
    #[arg(long)]
    strict: bool,

    /// Path to config file (default: search .dashqc.json in current dir and parents)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create .dashqc.json with sensible defaults
    Init {
        /// Dataset path to record in the config
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Report path to record in the config
        #[arg(long)]
        report: Option<PathBuf>,

        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    if let Some(Commands::Init {
        dataset,
        report,
        dir,
    }) = args.command
    {
        return run_init(dataset.as_deref(), report.as_deref(), dir.as_deref());
    }

    // Config search starts from the dataset's directory when a path is given,
    // otherwise from the working directory
    let work_dir = match args.path.as_deref() {
        Some(path) => match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = load_config(&work_dir, args.config.as_deref())?.merge_with_cli(
        args.path.as_deref(),
        args.report.as_deref(),
        args.strict,
    );

    let Some(dataset) = config.dataset.clone() else {
        anyhow::bail!(
            "no dataset given; pass a CSV path or set \"dataset\" in {}",
            CONFIG_FILENAME
        );
    };
    let report = config.report.clone();

    if report.is_none() && !args.quiet && !args.json {
        eprintln!(
            "{}: no report path given; document checks skipped",
            "Info".blue()
        );
    }

    let engine = AuditEngine::from_config(&config);
    let outcome = engine.run(&dataset, report.as_deref())?;
    let result = &outcome.result;

    if args.json {
        println!("{}", JsonReporter::new().pretty().report(result));
    } else {
        let dir = history_dir(&dataset);
        let mut history = load_history(&dir);
        let delta = format_delta(
            previous_failed(&history, &dataset.to_string_lossy()),
            result.count(Status::Fail),
        );

        if args.quiet {
            ConsoleReporter::new().report_quiet(result, &delta);
        } else {
            let mut reporter = ConsoleReporter::new();
            if args.verbose {
                reporter = reporter.verbose();
            }
            reporter.report(result, &outcome.tree, &delta);
        }

        append_run(&mut history, result);
        if let Err(e) = save_history(&dir, &history) {
            if !args.quiet {
                eprintln!("{}: Failed to save history: {}", "Warning".yellow(), e);
            }
        }
    }

    if config.strict && result.has_failures() {
        if !args.quiet && !args.json {
            eprintln!(
                "{}: {} check(s) failed",
                "Failed".red().bold(),
                result.count(Status::Fail)
            );
        }
        return Ok(ExitCode::from(1));
    }

    Ok(ExitCode::SUCCESS)
}

fn run_init(
    dataset: Option<&Path>,
    report: Option<&Path>,
    dir: Option<&Path>,
) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let dir = dir.unwrap_or(&cwd);
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() {
        eprintln!(
            "{}: {} already exists; use --dir to write elsewhere or remove it first",
            "Warning".yellow(),
            config_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    std::fs::write(&config_path, starter_config(dataset, report))
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!(
        "{}: Created {}",
        "Done".green().bold(),
        config_path.display()
    );
    Ok(ExitCode::SUCCESS)
}
