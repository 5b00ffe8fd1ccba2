//! ScanLab CLI: scan and publish commands.
//!
//! Commands:
//! - `scan` runs one scan over the configured universe and writes alerts as JSONL
//! - `publish` re-ranks a JSONL alert file into a "latest" JSON payload

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scanlab_core::config::ScanConfig;
use scanlab_core::data::FixedVolatility;
use scanlab_core::scoring::ScoreMaps;
use scanlab_runner::export::DEFAULT_PUBLISH_MAX;
use scanlab_runner::{
    alert_line, open_source, publish_latest, run_scan, save_alerts_jsonl, save_report_json,
    FileFormat, LoadOptions, ScanOptions,
};

#[derive(Parser)]
#[command(name = "scanlab", about = "ScanLab CLI: rules-based equity alert scanner")]
struct Cli {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the universe and write ranked alerts.
    Scan {
        /// Scan configuration (TOML).
        #[arg(long, default_value = "config/scan.toml")]
        config: PathBuf,

        /// Score maps (TOML).
        #[arg(long, default_value = "config/score_maps.toml")]
        score_maps: PathBuf,

        /// Directory holding `{SYMBOL}_{interval}` bar files.
        #[arg(long, default_value = "data/raw")]
        data_dir: PathBuf,

        /// Bar file format: csv or parquet.
        #[arg(long, default_value = "csv")]
        format: FileFormat,

        /// Use generated demo bars instead of files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Current volatility index level (e.g. VIX close).
        #[arg(long)]
        vix: Option<f64>,

        /// Symbols to scan. Defaults to `[meta].symbols` in the config.
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        symbols: Vec<String>,

        /// Alerts output (JSON Lines).
        #[arg(long, default_value = "data/processed/alerts.jsonl")]
        output: PathBuf,

        /// Optional run report output (JSON).
        #[arg(long)]
        report: Option<PathBuf>,

        /// Evaluate symbols on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Publish the top alerts from a JSONL file as a single JSON payload.
    Publish {
        /// Alerts input (JSON Lines).
        #[arg(long, default_value = "data/processed/alerts.jsonl")]
        input: PathBuf,

        /// Payload output (JSON).
        #[arg(long, default_value = "public/latest.json")]
        output: PathBuf,

        /// Maximum number of alerts to publish.
        #[arg(long, default_value_t = DEFAULT_PUBLISH_MAX)]
        max: usize,

        /// Run report to attach to the payload.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Scan {
            config,
            score_maps,
            data_dir,
            format,
            synthetic,
            vix,
            symbols,
            output,
            report,
            sequential,
        } => run_scan_cmd(ScanArgs {
            config,
            score_maps,
            data_dir,
            format,
            synthetic,
            vix,
            symbols,
            output,
            report,
            sequential,
        }),
        Commands::Publish {
            input,
            output,
            max,
            report,
        } => run_publish_cmd(&input, &output, max, report.as_deref()),
    }
}

/// Logs go to stderr; stdout carries the regime and alert lines.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

struct ScanArgs {
    config: PathBuf,
    score_maps: PathBuf,
    data_dir: PathBuf,
    format: FileFormat,
    synthetic: bool,
    vix: Option<f64>,
    symbols: Vec<String>,
    output: PathBuf,
    report: Option<PathBuf>,
    sequential: bool,
}

fn run_scan_cmd(args: ScanArgs) -> Result<()> {
    let config = ScanConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let maps = ScoreMaps::from_file(&args.score_maps)
        .with_context(|| format!("loading {}", args.score_maps.display()))?;

    if !args.synthetic && !args.data_dir.is_dir() {
        bail!(
            "data directory {} not found (pass --synthetic to scan demo data)",
            args.data_dir.display()
        );
    }
    if let Some(v) = args.vix {
        if !v.is_finite() || v < 0.0 {
            bail!("--vix must be a non-negative number, got {v}");
        }
    }

    let source = open_source(&LoadOptions {
        data_dir: args.data_dir,
        format: args.format,
        synthetic: args.synthetic,
        bar_interval: config.meta.bar_interval.clone(),
    });
    let opts = ScanOptions {
        symbols: args.symbols,
        parallel: !args.sequential,
    };

    let report = run_scan(
        &config,
        &maps,
        source.as_ref(),
        &FixedVolatility(args.vix),
        &opts,
    )?;

    let path = save_alerts_jsonl(&report.alerts, &args.output)?;
    info!(path = %path.display(), alerts = report.alerts.len(), "alerts saved");
    if let Some(report_path) = &args.report {
        let path = save_report_json(&report, report_path)?;
        info!(path = %path.display(), "run report saved");
    }

    println!(
        "Regime: {} | Alerts saved to: {}",
        report.regime.regime,
        path.display()
    );
    for alert in &report.alerts {
        println!("{}", alert_line(alert));
    }
    if !report.skipped.is_empty() {
        println!("Skipped {} symbol(s); see logs for reasons", report.skipped.len());
    }
    Ok(())
}

fn run_publish_cmd(input: &Path, output: &Path, max: usize, report: Option<&Path>) -> Result<()> {
    if max == 0 {
        bail!("--max must be at least 1");
    }
    let payload = publish_latest(input, output, max, report)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        alerts = payload.alerts.len(),
        "latest published"
    );
    println!(
        "Published {} alert(s) to {}",
        payload.alerts.len(),
        output.display()
    );
    Ok(())
}
