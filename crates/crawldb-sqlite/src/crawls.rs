use crate::{CrawlId, CrawlRecord, Db, StoreError};
use onionwatch_core::now_ms;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

impl Db {
    /// Store a new snapshot of `url`, timestamped now.
    pub fn insert_crawl_record(&self, url: &str, page: &str) -> Result<CrawlId, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO crawls(url, timestamp_ms, page) VALUES (?,?,?)",
            params![url, now_ms(), page],
        )?;
        let id = conn.last_insert_rowid();
        debug!(url, id, "cached crawl record");
        Ok(id)
    }

    pub fn get_crawl_record(&self, id: CrawlId) -> Result<CrawlRecord, StoreError> {
        self.conn()
            .query_row(
                "SELECT crawl_id, url, timestamp_ms, page FROM crawls WHERE crawl_id=?",
                [id],
                |r| {
                    Ok(CrawlRecord {
                        id: r.get(0)?,
                        url: r.get(1)?,
                        timestamp_ms: r.get(2)?,
                        page: r.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound)
    }

    /// Was `url` fetched more recently than the look-back window allows?
    ///
    /// `window_ms` is an offset from now, typically negative: a record
    /// qualifies when `timestamp_ms > now + window_ms`. Returns the id of
    /// one qualifying record, or None. Only a scan-avoidance hint; a miss
    /// costs a redundant fetch, so the check always reads live rows rather
    /// than anything cached.
    pub fn has_crawl_record(
        &self,
        url: &str,
        window_ms: i64,
    ) -> Result<Option<CrawlId>, StoreError> {
        let bound = now_ms() + window_ms;
        let id: Option<CrawlId> = self
            .conn()
            .query_row(
                "SELECT crawl_id FROM crawls WHERE url=? AND timestamp_ms > ? LIMIT 1",
                params![url, bound],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_db(dir: &tempfile::TempDir) -> Db {
        Db::open_or_create(dir.path().join("crawl.db")).unwrap()
    }

    #[test]
    fn insert_then_point_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        let id = db
            .insert_crawl_record("http://abc.onion/", "<html>hi</html>")
            .unwrap();
        let rec = db.get_crawl_record(id).unwrap();
        assert_eq!(rec.id, id);
        assert_eq!(rec.url, "http://abc.onion/");
        assert_eq!(rec.page, "<html>hi</html>");
        assert!(rec.timestamp_ms > 0);
    }

    #[test]
    fn missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        assert!(matches!(
            db.get_crawl_record(42).unwrap_err(),
            StoreError::NotFound
        ));
    }

    #[test]
    fn freshness_window_honors_url_and_age() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        let id = db.insert_crawl_record("http://abc.onion/", "page").unwrap();

        // fetched just now, well inside a 10s look-back
        assert_eq!(
            db.has_crawl_record("http://abc.onion/", -10_000).unwrap(),
            Some(id)
        );
        // exact-URL match only
        assert_eq!(
            db.has_crawl_record("http://abc.onion/other", -10_000).unwrap(),
            None
        );
        // once the record is older than the window, it no longer counts
        std::thread::sleep(std::time::Duration::from_millis(15));
        assert_eq!(db.has_crawl_record("http://abc.onion/", -5).unwrap(), None);
    }

    #[test]
    fn superseding_snapshots_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir);
        let a = db.insert_crawl_record("http://abc.onion/", "v1").unwrap();
        let b = db.insert_crawl_record("http://abc.onion/", "v2").unwrap();
        assert_ne!(a, b);
        assert_eq!(db.get_crawl_record(a).unwrap().page, "v1");
        assert_eq!(db.get_crawl_record(b).unwrap().page, "v2");
    }
}
