use std::collections::BTreeMap;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use stow_types::RemoteLocation;

use crate::error::StoreResult;

/// String-keyed custom metadata attached to a remote object.
pub type ObjectMetadata = BTreeMap<String, String>;

/// How a processor's byte stream should be treated by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// UTF-8 text.
    Text,
    /// Opaque bytes.
    Binary,
}

impl Encoding {
    /// MIME type recorded on remote objects.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Binary => "application/octet-stream",
        }
    }
}

/// A write that becomes visible only on [`StagedWrite::commit`].
///
/// Dropping a staged write without committing discards it and leaves any
/// previous artifact untouched.
pub trait StagedWrite: Write + Send {
    /// Publish the written bytes at the handle's path.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Storage primitive for a single artifact path.
///
/// Implementations must satisfy:
/// - the path is fixed at construction;
/// - a reader never observes a half-written artifact written through
///   [`BackendHandle::open_write`];
/// - all I/O errors are propagated, never retried or swallowed.
pub trait BackendHandle: Send + Sync {
    /// The artifact path this handle is bound to.
    fn path(&self) -> &str;

    /// Encoding the handle was opened with.
    fn encoding(&self) -> Encoding;

    /// Whether an artifact currently exists at the path.
    fn exists(&self) -> StoreResult<bool>;

    /// Open the artifact for reading.
    ///
    /// Returns `StoreError::NotFound` if it does not exist.
    fn open_read(&self) -> StoreResult<Box<dyn Read + Send>>;

    /// Stage a replacement for the artifact.
    fn open_write(&self) -> StoreResult<Box<dyn StagedWrite>>;

    /// Delete the artifact. Returns `StoreError::NotFound` if absent.
    fn remove(&self) -> StoreResult<()>;

    /// When the artifact was last written.
    fn last_modified(&self) -> StoreResult<DateTime<Utc>>;
}

/// Client for a remote object store.
///
/// This is the boundary to a concrete storage service. The metadata methods
/// form the sub-interface used for provenance labels: `patch_metadata` must
/// merge into existing metadata, never replace it.
pub trait ObjectStorageClient: Send + Sync {
    /// Whether the object exists.
    fn exists(&self, location: &RemoteLocation) -> StoreResult<bool>;

    /// Download the object's bytes.
    fn get(&self, location: &RemoteLocation) -> StoreResult<Vec<u8>>;

    /// Upload the object, replacing any existing object and its metadata.
    fn put(&self, location: &RemoteLocation, data: Vec<u8>, content_type: &str) -> StoreResult<()>;

    /// Delete the object.
    fn delete(&self, location: &RemoteLocation) -> StoreResult<()>;

    /// Timestamp stored with the object.
    fn updated_at(&self, location: &RemoteLocation) -> StoreResult<DateTime<Utc>>;

    /// Custom metadata currently attached to the object.
    fn get_metadata(&self, location: &RemoteLocation) -> StoreResult<ObjectMetadata>;

    /// Add or overwrite the given metadata entries, keeping all others.
    fn patch_metadata(&self, location: &RemoteLocation, patch: &ObjectMetadata) -> StoreResult<()>;
}
