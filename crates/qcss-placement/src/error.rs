//! Chunk mapping error types.

use thiserror::Error;

use qcss_core::ChunkId;

/// Errors that can occur while assigning chunks to workers.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("empty worker list: cannot place new chunk {chunk} of {db}.{table}")]
    EmptyWorkerList {
        db: String,
        table: String,
        chunk: ChunkId,
    },

    #[error("css error: {0}")]
    Css(#[from] qcss_css::CssError),
}

pub type MappingResult<T> = Result<T, MappingError>;
