use thiserror::Error;

use stow_store::StoreError;

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("metadata request for {path} failed: {source}")]
    Store {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to encode required outputs: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type AnnotationResult<T> = Result<T, AnnotationError>;
