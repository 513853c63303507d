use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be opened or initialized. Fatal at
    /// startup; callers must not start scanning without a store.
    #[error("backing store unavailable: {0}")]
    Unavailable(#[source] rusqlite::Error),
    /// A point lookup matched nothing. An expected outcome, never fatal.
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
