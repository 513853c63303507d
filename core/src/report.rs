//! Per-target scan accumulator.
//!
//! A `Report` is created by the caller, handed to the orchestrator for one
//! scan invocation, mutated in place by whichever probe handles each action,
//! and finally read by the correlation engine and the report writers.

use crate::Onion;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub onion: Onion,
    pub date_scanned_ms: i64,

    pub web_detected: bool,
    pub tls_detected: bool,
    pub ssh_detected: bool,
    pub ftp_detected: bool,
    pub smtp_detected: bool,

    pub ssh_key: String,
    pub ssh_banner: String,
    pub ftp_banner: String,
    pub smtp_banner: String,

    /// Crawl-record ids in the store that belong to this target.
    pub crawls: Vec<i64>,

    /// Action names that actually completed, in execution order.
    pub performed_scans: Vec<String>,
    /// Resumption marker for an external driver: the last performed action,
    /// or "none" when nothing completed.
    pub next_action: String,
    pub timed_out: bool,
}

impl Report {
    pub fn new(onion: &str) -> Report {
        Report {
            onion: onion.into(),
            date_scanned_ms: crate::now_ms(),
            next_action: "none".to_string(),
            ..Report::default()
        }
    }

    pub fn add_crawl_id(&mut self, id: i64) {
        self.crawls.push(id);
    }

    pub fn serialize(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
