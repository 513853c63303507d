//! SQLite-backed crawl database: the relationship fact store and the
//! crawl-record cache shared by every concurrently running scan.

mod crawls;
mod error;
mod models;
mod open;
mod relationships;
mod schema;

pub use error::StoreError;
pub use models::*;
pub use open::Db;

/// Default look-back for "was this URL fetched recently": 100 hours,
/// expressed as a negative offset from now. A configured rescan window
/// takes precedence when present.
pub const DEFAULT_RESCAN_WINDOW_MS: i64 = -100 * 60 * 60 * 1000;
