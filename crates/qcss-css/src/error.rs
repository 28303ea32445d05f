//! CSS access error types.

use thiserror::Error;

/// Errors that can occur while reading or writing CSS records.
#[derive(Debug, Error)]
pub enum CssError {
    #[error("no such database: {0}")]
    NoSuchDb(String),

    #[error("no such table: {db}.{table}")]
    NoSuchTable { db: String, table: String },

    #[error("malformed replica record at {path}: {reason}")]
    BadReplica { path: String, reason: String },

    #[error("kv tree error: {0}")]
    Kv(#[from] qcss_kv::KvError),
}

pub type CssResult<T> = Result<T, CssError>;
