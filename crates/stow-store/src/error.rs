use stow_types::TypeError;

/// Errors from backend handle operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The artifact does not exist.
    #[error("no such artifact: {0}")]
    NotFound(String),

    /// The path cannot be mapped to a backend.
    #[error("invalid backend path: {0}")]
    InvalidPath(#[from] TypeError),

    /// The path uses a remote scheme with no registered client.
    #[error("no storage client registered for scheme {scheme:?} (path {path})")]
    UnknownScheme { scheme: String, path: String },

    /// I/O error from the local filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote storage client reported a failure.
    #[error("storage client error for {path}: {reason}")]
    Client { path: String, reason: String },

    /// The remote store refuses writes.
    #[error("store is read-only")]
    ReadOnly,
}

impl StoreError {
    /// Returns `true` if this error means the path has no artifact.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this error stems from the path itself rather than
    /// from storage.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidPath(_) | Self::UnknownScheme { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
