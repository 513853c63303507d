use serde::{Deserialize, Serialize};

pub type RelationshipId = i64;
pub type CrawlId = i64;

/// A stored fact linking an identifier observed on some channel back to a
/// subject onion. At most one row exists per distinct
/// `(onion, channel, kind, identifier)` tuple; rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub onion: String,
    /// Observation channel, e.g. "ssh", "ftp", "crawl".
    pub channel: String,
    /// Identifier category, e.g. "key-fingerprint", "software-banner".
    pub kind: String,
    pub identifier: String,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
}

/// A cached snapshot of one fetched resource. Created once per fetch and
/// never mutated; superseded snapshots coexist, most recent wins by
/// timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub id: CrawlId,
    pub url: String,
    pub timestamp_ms: i64,
    pub page: String,
}
