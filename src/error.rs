//! Crate-wide error type.
//!
//! Resource exhaustion, precondition violations, and policy failures each
//! get their own variant rather than a single opaque string.

use thiserror::Error;

use crate::common::TupleId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short transfer at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortTransfer {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid tuple id: {0:?}")]
    InvalidTupleId(TupleId),

    #[error("attribute mismatch: {0}")]
    AttributeMismatch(String),

    #[error("buffer pool exhausted: no unpinned frame available for eviction")]
    BufferPoolExhausted,

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("invalid table path: {0}")]
    InvalidTablePath(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
