use thiserror::Error;

use crate::artifact::ArtifactKind;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("no processor registered for {path:?}")]
    UnknownExtension { path: String },

    #[error("processor {processor} cannot handle {kind} artifacts")]
    UnsupportedArtifact {
        processor: &'static str,
        kind: ArtifactKind,
    },

    #[error("row {row} has {actual} cells, table has {expected} columns")]
    RowShape {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("column mismatch: expected {expected:?}, got {actual:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("no table fragments found in {0}")]
    NoFragments(String),

    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("malformed {format} data: {reason}")]
    Malformed { format: &'static str, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;
