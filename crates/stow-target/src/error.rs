use thiserror::Error;

use stow_codec::CodecError;
use stow_lock::LockError;
use stow_store::StoreError;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("backend error: {0}")]
    Backend(#[source] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock acquisition failed: {0}")]
    LockAcquisition(#[from] LockError),

    #[error("codec error: {0}")]
    Codec(#[source] CodecError),

    #[error("model strategy failed: {0:#}")]
    Model(#[source] anyhow::Error),
}

impl TargetError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Wrap a failure from a model save or load function. Codec failures
    /// keep their classification.
    pub(crate) fn from_model(err: anyhow::Error) -> Self {
        match err.downcast::<CodecError>() {
            Ok(codec) => codec.into(),
            Err(other) => Self::Model(other),
        }
    }
}

impl From<StoreError> for TargetError {
    fn from(err: StoreError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else if err.is_configuration() {
            Self::Configuration(err.to_string())
        } else {
            Self::Backend(err)
        }
    }
}

impl From<CodecError> for TargetError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::NoFragments(_) => Self::NotFound(err.to_string()),
            CodecError::UnknownExtension { .. } | CodecError::InvalidChunkSize => {
                Self::Configuration(err.to_string())
            }
            CodecError::Io(io) => Self::Io(io),
            other => Self::Codec(other),
        }
    }
}

pub type TargetResult<T> = Result<T, TargetError>;
