//! The per-target scan orchestrator.
//!
//! One `Scanner` invocation drives a fixed, ordered list of action names
//! for one target: actions run strictly sequentially (later probes may
//! read fields earlier ones wrote), probe failures are absorbed, and a
//! wall-clock budget is checked cooperatively between actions. Many
//! targets may run in parallel against the shared store.

use crate::correlation::CorrelationEngine;
use async_trait::async_trait;
use crawldb_sqlite::{Db, StoreError};
use onionwatch_core::{now_ms, CrawlConfig, Onion, Report};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A probe for one protocol. Each implementation writes only to its own
/// dedicated report fields.
#[async_trait]
pub trait ProtocolScanner: Send + Sync {
    async fn scan_protocol(
        &self,
        onion: &Onion,
        config: &ScanConfig,
        report: &mut Report,
    ) -> anyhow::Result<()>;
}

/// Maps action names to probes. Protocols are added by registration, not
/// by editing the orchestrator.
#[derive(Default)]
pub struct ScannerRegistry {
    scanners: HashMap<String, Box<dyn ProtocolScanner>>,
}

impl ScannerRegistry {
    pub fn new() -> ScannerRegistry {
        ScannerRegistry::default()
    }

    pub fn register(&mut self, action: &str, scanner: Box<dyn ProtocolScanner>) {
        self.scanners.insert(action.to_string(), scanner);
    }

    pub fn get(&self, action: &str) -> Option<&dyn ProtocolScanner> {
        self.scanners.get(action).map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scanners.keys().cloned().collect();
        names.sort();
        names
    }
}

pub struct ScanConfig {
    pub db: Db,
    /// Soft wall-clock budget per target. Checked between actions only; a
    /// slow probe already in flight is never preempted.
    pub timeout: Duration,
    /// Look-back offset (negative ms) for crawl freshness checks.
    pub rescan_window_ms: i64,
    /// Ordered action names to execute.
    pub scans: Vec<String>,
    /// Per-target crawl configuration, keyed by onion.
    pub crawl_configs: HashMap<String, CrawlConfig>,
}

#[derive(Debug, Error)]
pub enum ScanError {
    /// A configured action has no registered probe. Fatal to the whole
    /// run, unlike runtime probe failures.
    #[error("unknown scanner {0:?}")]
    UnknownScanner(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Scanner {
    config: Arc<ScanConfig>,
    registry: Arc<ScannerRegistry>,
    correlator: CorrelationEngine,
}

impl Scanner {
    pub fn new(config: Arc<ScanConfig>, registry: Arc<ScannerRegistry>) -> Scanner {
        Scanner {
            config,
            registry,
            correlator: CorrelationEngine::default(),
        }
    }

    pub fn with_correlator(mut self, correlator: CorrelationEngine) -> Scanner {
        self.correlator = correlator;
        self
    }

    /// Run the configured action sequence against `report`'s target, then
    /// project the accumulated findings into the relationship store. The
    /// projection runs even after a timeout: partial findings still count.
    pub async fn run(&self, report: &mut Report) -> Result<(), ScanError> {
        let onion = report.onion.clone();
        info!(onion = %onion, scans = self.config.scans.len(), "starting scan");

        for action in &self.config.scans {
            let probe = self
                .registry
                .get(action)
                .ok_or_else(|| ScanError::UnknownScanner(action.clone()))?;

            match probe.scan_protocol(&onion, &self.config, report).await {
                Ok(()) => {
                    debug!(onion = %onion, action = %action, "action completed");
                    report.performed_scans.push(action.clone());
                }
                Err(e) => {
                    warn!(onion = %onion, action = %action, error = %e, "probe failed, continuing");
                }
            }

            let elapsed = now_ms() - report.date_scanned_ms;
            let budget_ms = i64::try_from(self.config.timeout.as_millis()).unwrap_or(i64::MAX);
            if elapsed > budget_ms {
                warn!(onion = %onion, elapsed_ms = elapsed, "scan budget exceeded");
                report.timed_out = true;
                break;
            }
        }

        report.next_action = report
            .performed_scans
            .last()
            .cloned()
            .unwrap_or_else(|| "none".to_string());

        self.correlator.correlate(report, &self.config.db)?;
        info!(onion = %onion, performed = report.performed_scans.len(),
              timed_out = report.timed_out, "scan finished");
        Ok(())
    }
}
