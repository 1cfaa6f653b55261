//! LayoutOpt Command Line Interface
//!
//! Usage:
//!   layoutopt [OPTIONS] <input-file>
//!   layoutopt --help
//!
//! Examples:
//!   layoutopt blur.pipe                        # Search and print the new pipeline
//!   layoutopt --emit=report blur.pipe          # Per-round search summary
//!   layoutopt --split-tracking=reference gemm.pipe
//!   layoutopt --from-env --emit=json blur.pipe # Honor LAYOUTOPT_* toggles

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use layoutopt::autotuning::{SearchConfig, SearchOutcome, SplitCostTracking};
use layoutopt::analysis::CostModel;
use layoutopt::utils::{excerpt, print_pipeline, LayoutError};
use log::{debug, info};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// LayoutOpt - data-layout auto-tuning for stage pipelines
#[derive(Parser, Debug)]
#[command(name = "layoutopt")]
#[command(version)]
#[command(about = "Searches for cheaper storage layouts of pipeline inputs", long_about = None)]
struct Cli {
    /// Pipeline description to optimize
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// What to emit
    #[arg(long, default_value = "pipeline")]
    emit: EmitKind,

    /// Upper bound on search rounds
    #[arg(long, value_name = "N")]
    max_rounds: Option<usize>,

    /// Factor used by the split transformation
    #[arg(long, value_name = "F", value_parser = clap::value_parser!(i64).range(2..))]
    split_factor: Option<i64>,

    /// Running-minimum policy for split candidates
    #[arg(long)]
    split_tracking: Option<TrackingArg>,

    /// Keep the input layout; only score it
    #[arg(long)]
    no_transform: bool,

    /// Log every committed round at info level
    #[arg(long)]
    debug: bool,

    /// Read the enable/debug toggles from LAYOUTOPT_USE_DATA_TRANSFORM and
    /// LAYOUTOPT_DEBUG_DATA_TRANSFORM
    #[arg(long)]
    from_env: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TrackingArg {
    /// A split win lowers the running minimum like any other
    Consistent,
    /// A split win leaves the running minimum unchanged
    Reference,
}

impl From<TrackingArg> for SplitCostTracking {
    fn from(arg: TrackingArg) -> Self {
        match arg {
            TrackingArg::Consistent => SplitCostTracking::Consistent,
            TrackingArg::Reference => SplitCostTracking::Reference,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Transformed pipeline in the description language
    Pipeline,
    /// Human-readable search summary
    Report,
    /// Search outcome as JSON
    Json,
    /// Itemized cost of the transformed pipeline
    Cost,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 if cli.debug => log::LevelFilter::Info,
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    info!("LayoutOpt v{}", layoutopt::VERSION);
    debug!("Input file: {:?}", cli.input);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input file {}", cli.input.display()))?;

    let pipeline = match layoutopt::parse_pipeline(&source) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            if let Some(snippet) = err
                .downcast_ref::<LayoutError>()
                .and_then(LayoutError::span)
                .and_then(|span| excerpt(&source, &span))
            {
                eprintln!("{}", snippet);
            }
            return Err(err.context(format!("failed to load {}", cli.input.display())));
        }
    };
    info!("Loaded {} stage(s)", pipeline.len());

    let config = build_config(cli);
    debug!("Search config: {:?}", config);

    let outcome = layoutopt::optimize(&pipeline, config);
    info!(
        "Cost {:.6} -> {:.6} after {} round(s)",
        outcome.baseline_cost, outcome.final_cost, outcome.rounds
    );

    let output = render(&outcome, cli.emit)?;
    write_output(&cli.output, &output)
}

fn build_config(cli: &Cli) -> SearchConfig {
    let mut config = if cli.from_env {
        SearchConfig::from_env()
    } else {
        SearchConfig::default()
    };

    if cli.no_transform {
        config = config.enabled(false);
    }
    if cli.debug {
        config = config.debug(true);
    }
    if let Some(rounds) = cli.max_rounds {
        config = config.max_rounds(rounds);
    }
    if let Some(factor) = cli.split_factor {
        config = config.split_factor(factor);
    }
    if let Some(tracking) = cli.split_tracking {
        config = config.split_tracking(tracking.into());
    }
    config
}

fn render(outcome: &SearchOutcome, emit: EmitKind) -> Result<String> {
    Ok(match emit {
        EmitKind::Pipeline => print_pipeline(&outcome.pipeline),
        EmitKind::Report => outcome.report(),
        EmitKind::Json => outcome.to_json().context("failed to serialize search outcome")?,
        EmitKind::Cost => {
            let breakdown = CostModel::new().breakdown(&outcome.pipeline);
            let mut out = String::new();
            for entry in &breakdown.entries {
                let _ = writeln!(
                    out,
                    "{:<16} {:<16} order {:>12.6} distance {:>12.6}",
                    entry.producer, entry.consumer, entry.order, entry.distance
                );
            }
            let _ = writeln!(out, "total {:.6}", breakdown.total());
            out
        }
    })
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("failed to write output file {}", p.display()))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
