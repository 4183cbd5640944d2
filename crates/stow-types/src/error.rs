use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("malformed remote path {path:?}: {reason}")]
    MalformedRemotePath { path: String, reason: String },
}
