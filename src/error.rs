use thiserror::Error;

/// Error kinds raised by the storage and execution core.
///
/// `Invariant` is fatal: callers that observe it should log and abort rather
/// than attempt recovery, per the buffer-pool and slotted-page invariants.
#[derive(Error, Debug)]
pub enum PagebaseError {
    #[error("buffer pool is full")]
    BufferFull,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for PagebaseError {
    fn from(e: serde_json::Error) -> Self {
        PagebaseError::SchemaParse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PagebaseError>;
