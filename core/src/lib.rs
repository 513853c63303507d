//! Core shared types for the onionwatch engine.

pub mod crawl_config;
pub mod report;

pub use crawl_config::{CrawlConfig, ExtraRelationshipRule, RelationshipRule};
pub use report::Report;

use serde::{Deserialize, Serialize};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// A hidden-service address being scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Onion(pub String);

impl Onion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Onion {
    fn from(s: &str) -> Self {
        Onion(s.to_string())
    }
}

impl std::fmt::Display for Onion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current wall-clock time as milliseconds since the unix epoch.
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
