//! padscan CLI
//!
//! Command-line tool for recovering GPIO pad tables from firmware images.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use padscan::compare::diff_states;
use padscan::formatter::{
    format_state_diff, HumanFormatter, JsonFormatter, RecoveryFormatter, ShortFormatter,
};
use padscan::{
    load_hints_or_none, load_oracle_or_blind, recover_bytes_with_options, CompositionMode,
    Recovery, RecoveryOptions, RecoveryOutcome, ScanOptions,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Intel PCH GPIO pad table recovery.
///
/// Scans vendor firmware images for pad configuration tables, composes
/// them into one pad state and prints it.
#[derive(Parser, Debug)]
#[command(name = "padscan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Firmware image(s) to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "human")]
    format: OutputFormat,

    /// Composition mode
    #[arg(short, long, default_value = "auto")]
    mode: ModeArg,

    /// Scan preset
    #[arg(short, long, default_value = "normal")]
    preset: Preset,

    /// Reference gpio.h or JSON mode map
    #[arg(short, long, env = "PADSCAN_REFERENCE")]
    reference: Option<PathBuf>,

    /// Synthesis hints JSON
    #[arg(long, env = "PADSCAN_HINTS")]
    hints: Option<PathBuf>,

    /// Minimum entries for a generic-scan table
    #[arg(long)]
    min_entries: Option<usize>,

    /// List every candidate table
    #[arg(short, long)]
    tables: bool,

    /// Diff the pad states of exactly two images
    #[arg(long)]
    compare: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (only output essential info)
    #[arg(short, long)]
    quiet: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// Compact single-line output
    Short,
}

/// Composition mode options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Oracle when a reference is given, blind otherwise
    Auto,
    /// Reference-guided correction
    Oracle,
    /// Heuristic layering
    Blind,
}

impl From<ModeArg> for CompositionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => CompositionMode::Auto,
            ModeArg::Oracle => CompositionMode::Oracle,
            ModeArg::Blind => CompositionMode::Blind,
        }
    }
}

/// Scan preset options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// Default scan
    Normal,
    /// Drop small physical fragments
    Strict,
    /// Always run the generic scan
    Thorough,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging if verbose
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("padscan=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let options = build_options(&args);

    let result = if args.compare {
        run_compare(&args, &options)
    } else {
        run_files(&args, &options)
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_options(args: &Args) -> RecoveryOptions {
    let mut scan = match args.preset {
        Preset::Normal => ScanOptions::new(),
        Preset::Strict => ScanOptions::strict(),
        Preset::Thorough => ScanOptions::thorough(),
    };
    if let Some(n) = args.min_entries {
        scan.min_entries = n;
    }

    RecoveryOptions {
        scan,
        mode: args.mode.into(),
        oracle: args.reference.as_deref().and_then(load_oracle_or_blind),
        hints: args.hints.as_deref().and_then(load_hints_or_none),
        ..RecoveryOptions::default()
    }
}

fn recover_path(path: &Path, options: &RecoveryOptions) -> anyhow::Result<RecoveryOutcome> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    recover_bytes_with_options(&data, options)
        .with_context(|| format!("failed to analyze {}", path.display()))
}

fn report_unrecovered(path: &Path, outcome: &RecoveryOutcome) {
    match outcome {
        RecoveryOutcome::NoTablesFound => {
            eprintln!("{}: no pad tables found", path.display());
        }
        RecoveryOutcome::NoBaseTable { tables } => {
            eprintln!(
                "{}: {} table(s) found, none usable as a physical base",
                path.display(),
                tables.len()
            );
        }
        RecoveryOutcome::Recovered(_) => {}
    }
}

fn formatter(args: &Args) -> Box<dyn RecoveryFormatter> {
    match args.format {
        OutputFormat::Human => Box::new(HumanFormatter {
            verbose: args.verbose,
            quiet: args.quiet,
            show_tables: args.tables,
        }),
        OutputFormat::Json => Box::new(JsonFormatter {
            show_tables: args.tables,
            ..JsonFormatter::new()
        }),
        OutputFormat::Short => Box::new(ShortFormatter::new()),
    }
}

fn run_files(args: &Args, options: &RecoveryOptions) -> anyhow::Result<bool> {
    let formatter = formatter(args);
    let mut success = true;

    for path in &args.files {
        match recover_path(path, options) {
            Ok(RecoveryOutcome::Recovered(recovery)) => {
                print!("{}", formatter.format_recovery(&recovery, path));
                if matches!(args.format, OutputFormat::Json) {
                    println!();
                }
            }
            Ok(outcome) => {
                if !args.quiet {
                    report_unrecovered(path, &outcome);
                }
                success = false;
            }
            Err(e) => {
                if !args.quiet {
                    eprintln!("Error: {:#}", e);
                }
                success = false;
            }
        }
    }

    Ok(success)
}

fn recover_for_compare(path: &Path, options: &RecoveryOptions) -> anyhow::Result<Recovery> {
    let outcome = recover_path(path, options)?;
    if !outcome.is_recovered() {
        report_unrecovered(path, &outcome);
    }
    outcome
        .into_recovery()
        .with_context(|| format!("no pad state recovered from {}", path.display()))
}

fn run_compare(args: &Args, options: &RecoveryOptions) -> anyhow::Result<bool> {
    let [a, b] = args.files.as_slice() else {
        bail!("--compare takes exactly two files, got {}", args.files.len());
    };

    let ra = recover_for_compare(a, options)?;
    let rb = recover_for_compare(b, options)?;
    let diff = diff_states(&ra.state, &rb.state);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
        _ => {
            let name_a = a.file_name().unwrap_or(a.as_os_str()).to_string_lossy();
            let name_b = b.file_name().unwrap_or(b.as_os_str()).to_string_lossy();
            print!("{}", format_state_diff(&diff, &name_a, &name_b));
        }
    }

    Ok(diff.physical.is_identical() && diff.virtual_pads.is_identical())
}
