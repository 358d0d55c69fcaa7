use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Result};
use camscan::config::ScanConfig;
use camscan::engine::ScanEngine;
use camscan::report::ScanReport;
use camscan::{logging, ports, server, targets};
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// camscan: streaming TCP connect scanner for network camera ports, with a tiny embedded web UI.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "camscan",
    version,
    about = "Streaming TCP connect scanner for network camera ports, with a tiny embedded web UI.",
    long_about = None
)]
struct Cli {
    /// Comma-separated targets, or path to a file with one target per line.
    #[arg(long)]
    targets: Option<String>,

    /// TOML file with scan settings (ports, timeout_ms, pacing_ms, concurrency, deadline_ms).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ports file (one port or range per line) replacing the camera port set.
    #[arg(long)]
    ports: Option<PathBuf>,

    /// Socket connect timeout in milliseconds.
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Pause between steps in milliseconds; 0 disables pacing.
    #[arg(long = "pacing-ms")]
    pacing_ms: Option<u64>,

    /// Ports of one target probed concurrently (1-16).
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop scanning new ports after this many milliseconds.
    #[arg(long = "deadline-ms")]
    deadline_ms: Option<u64>,

    /// How events are written to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the final report as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Serve the web UI instead of scanning from the command line.
    #[arg(long = "serve-ui", default_value_t = false)]
    serve_ui: bool,

    /// Address the web UI listens on.
    #[arg(long, default_value = "127.0.0.1:5000")]
    bind: String,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One human-readable line per event.
    Text,
    /// One JSON object per event.
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let config = build_config(&cli)?;
    info!(
        ports = ?config.ports,
        timeout_ms = config.timeout_ms,
        pacing_ms = config.pacing_ms,
        concurrency = config.concurrency,
        deadline_ms = ?config.deadline_ms,
        "configuration loaded"
    );
    let engine = ScanEngine::new(config);

    // Ctrl-C cancels the scan or stops the server.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    if cli.serve_ui {
        return server::serve(&cli.bind, engine, cancel).await;
    }

    let Some(arg) = cli.targets.as_deref() else {
        bail!("nothing to do: pass --targets or --serve-ui");
    };
    let targets = targets::load_targets(arg)?;
    if targets.is_empty() {
        warn!("no targets given; the scan will only report an empty summary");
    }

    let mut report = ScanReport::new(&engine.config().ports);
    let mut events = engine.scan_with_cancel(targets, cancel);
    let stdout = std::io::stdout();
    while let Some(ev) = events.next().await {
        report.observe(&ev);
        let mut out = stdout.lock();
        match cli.format {
            OutputFormat::Text => writeln!(out, "{ev}")?,
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&ev.to_record())?)?,
        }
        out.flush()?;
    }

    if !report.completed {
        warn!("scan cancelled before completion");
    }
    if let Some(path) = cli.output.as_deref() {
        report.write_json(path)?;
        info!("wrote JSON report to {}", path.display());
    }
    Ok(())
}

/// Config file first, then the ports file, then individual flags.
fn build_config(cli: &Cli) -> Result<ScanConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    if let Some(path) = cli.ports.as_deref() {
        config.ports = ports::load_ports_from_path(path)?;
    }
    if let Some(v) = cli.timeout_ms {
        config.timeout_ms = v;
    }
    if let Some(v) = cli.pacing_ms {
        config.pacing_ms = v;
    }
    if let Some(v) = cli.concurrency {
        config.concurrency = v;
    }
    if cli.deadline_ms.is_some() {
        config.deadline_ms = cli.deadline_ms;
    }
    config.validate()?;
    Ok(config)
}
