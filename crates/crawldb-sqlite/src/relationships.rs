use crate::{Db, Relationship, RelationshipId, StoreError};
use onionwatch_core::now_ms;
use rusqlite::{params, Row};
use std::collections::HashMap;
use tracing::debug;

fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        id: row.get(0)?,
        onion: row.get(1)?,
        channel: row.get(2)?,
        kind: row.get(3)?,
        identifier: row.get(4)?,
        first_seen_ms: row.get(5)?,
        last_seen_ms: row.get(6)?,
    })
}

const REL_COLUMNS: &str =
    "rel_id, onion, channel, kind, identifier, first_seen_ms, last_seen_ms";

impl Db {
    /// Record one observation of `(onion, channel, kind, identifier)`.
    ///
    /// The first observation of a tuple inserts a row with
    /// `first_seen_ms = last_seen_ms = now`; every later observation only
    /// advances `last_seen_ms`. The check-and-write happens in a single
    /// statement against the UNIQUE tuple constraint, so concurrent
    /// callers upserting the same tuple can never produce two rows.
    pub fn upsert_relationship(
        &self,
        onion: &str,
        channel: &str,
        kind: &str,
        identifier: &str,
    ) -> Result<RelationshipId, StoreError> {
        let now = now_ms();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO relationships(onion,channel,kind,identifier,first_seen_ms,last_seen_ms)
             VALUES (?,?,?,?,?,?)
             ON CONFLICT(onion,channel,kind,identifier)
             DO UPDATE SET last_seen_ms=excluded.last_seen_ms",
            params![onion, channel, kind, identifier, now, now],
        )?;
        let id: RelationshipId = conn.query_row(
            "SELECT rel_id FROM relationships
             WHERE onion=? AND channel=? AND kind=? AND identifier=?",
            params![onion, channel, kind, identifier],
            |r| r.get(0),
        )?;
        debug!(onion, channel, kind, identifier, id, "recorded relationship");
        Ok(id)
    }

    /// All facts whose subject is `onion`.
    pub fn relationships_by_onion(&self, onion: &str) -> Result<Vec<Relationship>, StoreError> {
        self.query_relationships("onion", onion)
    }

    /// All facts anywhere in the store carrying `identifier` — the primary
    /// cross-target correlation query.
    pub fn relationships_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Vec<Relationship>, StoreError> {
        self.query_relationships("identifier", identifier)
    }

    fn query_relationships(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Vec<Relationship>, StoreError> {
        let conn = self.conn();
        let sql = format!("SELECT {REL_COLUMNS} FROM relationships WHERE {column}=?");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([value], relationship_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Rebuild one channel's known facts for an identifier, keyed by kind.
    /// Last write wins should duplicate kinds ever exist, which the tuple
    /// constraint rules out.
    pub fn reconstruct_from_channel(
        &self,
        identifier: &str,
        channel: &str,
    ) -> Result<HashMap<String, Relationship>, StoreError> {
        let mut by_kind = HashMap::new();
        for rel in self.relationships_by_identifier(identifier)? {
            if rel.channel == channel {
                by_kind.insert(rel.kind.clone(), rel);
            }
        }
        Ok(by_kind)
    }

    pub fn count_relationships(&self) -> Result<i64, StoreError> {
        let cnt: i64 =
            self.conn()
                .query_row("SELECT COUNT(1) FROM relationships", [], |r| r.get(0))?;
        Ok(cnt)
    }

    /// How widely an identifier is shared across subjects.
    pub fn count_by_identifier(&self, identifier: &str) -> Result<i64, StoreError> {
        let cnt: i64 = self.conn().query_row(
            "SELECT COUNT(1) FROM relationships WHERE identifier=?",
            [identifier],
            |r| r.get(0),
        )?;
        Ok(cnt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_db(dir: &tempfile::TempDir) -> Db {
        Db::open_or_create(dir.path().join("crawl.db")).unwrap()
    }

    #[test]
    fn upsert_is_idempotent_per_tuple() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        let first = db
            .upsert_relationship("abc.onion", "ssh", "key-fingerprint", "AA:BB")
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = db
            .upsert_relationship("abc.onion", "ssh", "key-fingerprint", "AA:BB")
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(db.count_relationships().unwrap(), 1);

        let rels = db.relationships_by_onion("abc.onion").unwrap();
        assert_eq!(rels.len(), 1);
        assert!(rels[0].last_seen_ms > rels[0].first_seen_ms);
    }

    #[test]
    fn distinct_identifiers_are_distinct_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        let a = db
            .upsert_relationship("abc.onion", "ssh", "key-fingerprint", "AA")
            .unwrap();
        let b = db
            .upsert_relationship("abc.onion", "ssh", "key-fingerprint", "BB")
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(db.count_relationships().unwrap(), 2);
    }

    #[test]
    fn indices_return_only_matching_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        db.upsert_relationship("abc.onion", "ssh", "software-banner", "OpenSSH_7.2")
            .unwrap();
        db.upsert_relationship("def.onion", "ssh", "software-banner", "OpenSSH_7.2")
            .unwrap();
        db.upsert_relationship("def.onion", "ftp", "software-banner", "vsftpd")
            .unwrap();

        let by_onion = db.relationships_by_onion("def.onion").unwrap();
        assert_eq!(by_onion.len(), 2);
        assert!(by_onion.iter().all(|r| r.onion == "def.onion"));

        let shared = db.relationships_by_identifier("OpenSSH_7.2").unwrap();
        assert_eq!(shared.len(), 2);
        assert!(shared.iter().all(|r| r.identifier == "OpenSSH_7.2"));
        assert_eq!(db.count_by_identifier("OpenSSH_7.2").unwrap(), 2);
        assert_eq!(db.count_by_identifier("vsftpd").unwrap(), 1);
    }

    #[test]
    fn reconstruct_filters_by_channel_and_keys_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        db.upsert_relationship("abc.onion", "ssh", "key-fingerprint", "sameid")
            .unwrap();
        db.upsert_relationship("abc.onion", "ssh", "software-banner", "sameid")
            .unwrap();
        db.upsert_relationship("abc.onion", "ftp", "software-banner", "sameid")
            .unwrap();

        let view = db.reconstruct_from_channel("sameid", "ssh").unwrap();
        assert_eq!(view.len(), 2);
        assert!(view.contains_key("key-fingerprint"));
        assert!(view.contains_key("software-banner"));
        assert_eq!(view["software-banner"].channel, "ssh");
    }

    #[test]
    fn concurrent_upserts_of_one_tuple_yield_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        let mut handles = Vec::new();
        for _ in 0..100 {
            let db = db.clone();
            handles.push(std::thread::spawn(move || {
                db.upsert_relationship("abc.onion", "ssh", "key-fingerprint", "AA:BB")
                    .unwrap()
            }));
        }
        let ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(db.count_relationships().unwrap(), 1);
    }
}
