//! Projection of completed reports into relationship facts.
//!
//! Each rule names the channel and identifier kind it contributes and an
//! accessor pulling zero or more values out of a report. New protocols add
//! a rule; neither the store nor the orchestrator changes.

use crawldb_sqlite::{Db, StoreError};
use onionwatch_core::Report;

pub struct CorrelationRule {
    pub channel: &'static str,
    pub kind: &'static str,
    pub extract: fn(&Report) -> Vec<String>,
}

pub struct CorrelationEngine {
    rules: Vec<CorrelationRule>,
}

fn one(value: &str) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        vec![value.to_string()]
    }
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        CorrelationEngine {
            rules: vec![
                CorrelationRule {
                    channel: "ssh",
                    kind: "key-fingerprint",
                    extract: |r| one(&r.ssh_key),
                },
                CorrelationRule {
                    channel: "ssh",
                    kind: "software-banner",
                    extract: |r| one(&r.ssh_banner),
                },
                CorrelationRule {
                    channel: "ftp",
                    kind: "software-banner",
                    extract: |r| one(&r.ftp_banner),
                },
                CorrelationRule {
                    channel: "smtp",
                    kind: "software-banner",
                    extract: |r| one(&r.smtp_banner),
                },
                CorrelationRule {
                    channel: "crawl",
                    kind: "database-id",
                    extract: |r| r.crawls.iter().map(|id| id.to_string()).collect(),
                },
            ],
        }
    }
}

impl CorrelationEngine {
    pub fn add_rule(&mut self, rule: CorrelationRule) {
        self.rules.push(rule);
    }

    /// Write one fact per non-empty extracted value. Absent fields are
    /// skipped silently; there is no cross-fact transaction, so an error
    /// partway through leaves the already-submitted facts committed.
    pub fn correlate(&self, report: &Report, db: &Db) -> Result<(), StoreError> {
        for rule in &self.rules {
            for value in (rule.extract)(report) {
                if value.is_empty() {
                    continue;
                }
                db.upsert_relationship(report.onion.as_str(), rule.channel, rule.kind, &value)?;
            }
        }
        Ok(())
    }
}
