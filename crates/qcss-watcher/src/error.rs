//! Watcher error types.
//!
//! Executor failures are not listed here: they are recorded in the CSS as
//! `FAILED:<ddl>` and never leave a pass.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("css error: {0}")]
    Css(#[from] qcss_css::CssError),

    #[error("kv tree error: {0}")]
    Kv(#[from] qcss_kv::KvError),

    #[error("reconciliation task failed: {0}")]
    Task(String),
}

pub type WatcherResult<T> = Result<T, WatcherError>;
