use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use crawldb_sqlite::{Db, DEFAULT_RESCAN_WINDOW_MS};
use onionwatch_core::Report;
use onionwatch_engine::{ScanConfig, ScanError, Scanner};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod probes;
mod report_writer;

#[derive(Debug, Parser)]
#[command(name = "onionwatch", version, about = "Hidden service OPSEC scanner and correlation engine")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./onionwatch.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug-level logging
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Scan one or more hidden services
    Scan {
        /// Target onion address
        #[arg(conflicts_with = "targets")]
        target: Option<String>,
        /// File with newline-delimited targets (comments with # and blanks ignored)
        #[arg(long, value_name = "FILE", conflicts_with = "target")]
        targets: Option<PathBuf>,
        /// Crawl database path
        #[arg(long, default_value = "onionwatch.db")]
        db: PathBuf,
        /// Wall-clock budget per target, in seconds
        #[arg(long, default_value_t = 120)]
        timeout_s: u64,
        /// Comma-separated action names in execution order (default: all registered)
        #[arg(long)]
        scans: Option<String>,
        /// Directory tree of per-target crawl configs (one JSON per onion)
        #[arg(long)]
        crawl_config_dir: Option<PathBuf>,
        /// Rescan look-back in hours; overrides the built-in 100h window
        #[arg(long)]
        rescan_hours: Option<i64>,
        /// Number of targets scanned concurrently
        #[arg(long, default_value_t = 1)]
        target_concurrency: usize,
        /// Write each report to "<onion>.<SUFFIX>"; stdout if omitted
        #[arg(long, value_name = "SUFFIX")]
        json_report: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
    let loaded_cfg = config::load_config(cli.config.as_deref());

    match cli.command {
        Commands::Version => {
            println!(
                "onionwatch {} (core {})",
                env!("CARGO_PKG_VERSION"),
                onionwatch_core::version()
            );
            Ok(())
        }
        Commands::Scan {
            target,
            targets,
            mut db,
            mut timeout_s,
            mut scans,
            mut crawl_config_dir,
            mut rescan_hours,
            mut target_concurrency,
            mut json_report,
        } => {
            if let Some(cfg) = &loaded_cfg {
                if let Some(s) = &cfg.scan {
                    if let Some(p) = &s.db { db = p.clone(); }
                    if let Some(t) = s.timeout_s { timeout_s = t; }
                    if scans.is_none() { scans = s.scans.clone(); }
                    if crawl_config_dir.is_none() { crawl_config_dir = s.crawl_config_dir.clone(); }
                    if rescan_hours.is_none() { rescan_hours = s.rescan_hours; }
                    if let Some(c) = s.target_concurrency { target_concurrency = c; }
                    if json_report.is_none() { json_report = s.json_report.clone(); }
                }
            }

            let targets_list = collect_targets(target, targets)?;
            if targets_list.is_empty() {
                return Err(anyhow!("provide a target or --targets <file>"));
            }

            // An unreachable store must prevent startup, not fail mid-scan.
            let db = Db::open_or_create(&db)?;

            let registry = Arc::new(probes::default_registry());
            let scan_names: Vec<String> = match scans {
                Some(spec) => spec
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => registry.names(),
            };

            let crawl_configs = match crawl_config_dir {
                Some(dir) => config::load_crawl_configs(&dir),
                None => Default::default(),
            };

            let scan_config = Arc::new(ScanConfig {
                db,
                timeout: std::time::Duration::from_secs(timeout_s),
                rescan_window_ms: rescan_hours
                    .map(|h| -h * 60 * 60 * 1000)
                    .unwrap_or(DEFAULT_RESCAN_WINDOW_MS),
                scans: scan_names,
                crawl_configs,
            });

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(scan_all(
                targets_list,
                scan_config,
                registry,
                target_concurrency.max(1),
                json_report,
            ))
        }
    }
}

async fn scan_all(
    targets: Vec<String>,
    scan_config: Arc<ScanConfig>,
    registry: Arc<onionwatch_engine::ScannerRegistry>,
    target_concurrency: usize,
    json_report: Option<String>,
) -> Result<()> {
    let sem = Arc::new(tokio::sync::Semaphore::new(target_concurrency));
    let mut handles = Vec::with_capacity(targets.len());

    for onion in targets {
        let permit = sem.clone().acquire_owned().await?;
        let scan_config = scan_config.clone();
        let registry = registry.clone();
        let suffix = json_report.clone();
        handles.push(tokio::spawn(async move {
            let scanner = Scanner::new(scan_config, registry);
            let mut report = Report::new(&onion);
            let outcome = scanner.run(&mut report).await;
            if outcome.is_ok() {
                if let Err(e) = report_writer::write_json_report(&report, suffix.as_deref()) {
                    error!(onion = %onion, error = %e, "failed to serialize report");
                }
            }
            drop(permit);
            outcome
        }));
    }

    let mut first_err: Option<ScanError> = None;
    for h in handles {
        match h.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(error = %e, "scan failed");
                first_err.get_or_insert(e);
            }
            Err(e) => error!(error = %e, "scan task panicked"),
        }
    }
    match first_err {
        // a misconfigured action list is fatal for the whole invocation
        Some(e) => Err(e.into()),
        None => {
            info!("all scans complete");
            Ok(())
        }
    }
}

fn collect_targets(target: Option<String>, targets: Option<PathBuf>) -> Result<Vec<String>> {
    if let Some(t) = target {
        return Ok(vec![t]);
    }
    let Some(path) = targets else {
        return Ok(Vec::new());
    };
    let fh = std::fs::File::open(&path)?;
    let br = BufReader::new(fh);
    let mut out = Vec::new();
    for line in br.lines() {
        let line = line?;
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        out.push(t.to_string());
    }
    Ok(out)
}
