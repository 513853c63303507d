pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE relationships (
  rel_id          INTEGER PRIMARY KEY AUTOINCREMENT,
  onion           TEXT NOT NULL,
  channel         TEXT NOT NULL,
  kind            TEXT NOT NULL,
  identifier      TEXT NOT NULL,
  first_seen_ms   INTEGER NOT NULL,
  last_seen_ms    INTEGER NOT NULL,
  UNIQUE (onion, channel, kind, identifier)
);

CREATE TABLE crawls (
  crawl_id        INTEGER PRIMARY KEY AUTOINCREMENT,
  url             TEXT NOT NULL,
  timestamp_ms    INTEGER NOT NULL,
  page            TEXT NOT NULL
);

CREATE INDEX idx_rel_onion ON relationships(onion);
CREATE INDEX idx_rel_identifier ON relationships(identifier);
CREATE INDEX idx_crawls_url ON crawls(url);

COMMIT;
"#;
