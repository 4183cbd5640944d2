use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("timed out after {waited:?} waiting for lock {scope}")]
    Timeout { scope: String, waited: Duration },

    #[error("lock file {path}: {source}")]
    LockFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lock provider unavailable: {0}")]
    Unavailable(String),
}

pub type LockResult<T> = Result<T, LockError>;
