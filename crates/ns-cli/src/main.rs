//! NextStat systematic-variation histogramming CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ns_core::{Direction, NOMINAL, variation_label};
use ns_frame::{ColumnarEngine, Frame};
use std::path::{Path, PathBuf};

mod config;
mod pipeline;

#[derive(Parser)]
#[command(name = "nextstat-syst")]
#[command(about = "NextStat - Systematic-variation histogramming")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill nominal and varied histograms from a Parquet input
    Run {
        /// Analysis config (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Input events (Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (or file with `--json`)
        #[arg(short, long)]
        output: PathBuf,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Write one JSON document instead of a directory tree.
        #[arg(long)]
        json: bool,
    },

    /// Show input columns and the resolved systematic registry
    Inspect {
        /// Analysis config (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Input events (Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { config, input, output, threads, json } => {
            cmd_run(&config, &input, &output, threads, json)
        }
        Commands::Inspect { config, input, output } => cmd_inspect(&config, &input, output.as_ref()),
    }
}

fn load(config: &Path, input: &Path) -> Result<(config::AnalysisConfig, Frame)> {
    let cfg = config::read_config(config)
        .with_context(|| format!("failed to read config {}", config.display()))?;
    tracing::info!(path = %input.display(), "loading events");
    let frame = Frame::from_parquet(input)
        .with_context(|| format!("failed to read input {}", input.display()))?;
    tracing::info!(rows = frame.n_rows(), columns = frame.column_names().len(), "events loaded");
    Ok((cfg, frame))
}

fn cmd_run(config: &Path, input: &Path, output: &Path, threads: usize, json: bool) -> Result<()> {
    let (cfg, frame) = load(config, input)?;
    let mut frame = frame.with_threads(threads);
    let (out, summary) = pipeline::run(&cfg, &mut frame)?;

    if json {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, out.to_json()?)?;
    } else {
        out.write_json_tree(output)?;
    }
    tracing::info!(path = %output.display(), histograms = out.n_histograms(), "output written");
    write_json(None, serde_json::to_value(&summary)?)
}

fn cmd_inspect(config: &Path, input: &Path, output: Option<&PathBuf>) -> Result<()> {
    let (cfg, frame) = load(config, input)?;
    let registry = pipeline::build_registry(&cfg, &frame);
    let mut variations = vec![NOMINAL.to_string()];
    for s in registry.systematics() {
        variations.extend(Direction::BOTH.map(|d| variation_label(s, d)));
    }
    let unmatched: Vec<&str> =
        registry.systematics().filter(|s| registry.variables_for_systematic(s).is_empty()).collect();
    if !unmatched.is_empty() {
        tracing::warn!(?unmatched, "systematics without affected columns");
    }

    write_json(
        output,
        serde_json::json!({
            "rows": frame.n_rows(),
            "columns": frame.column_names(),
            "registry": registry,
            "variations": variations,
        }),
    )
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
