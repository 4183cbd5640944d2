use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use stow_types::RemoteLocation;

use crate::error::{StoreError, StoreResult};
use crate::local::LocalHandle;
use crate::remote::RemoteHandle;
use crate::traits::{BackendHandle, Encoding, ObjectStorageClient, StagedWrite};

/// A backend handle resolved from a path.
#[derive(Clone, Debug)]
pub enum ResolvedHandle {
    Local(LocalHandle),
    Remote(RemoteHandle),
}

impl ResolvedHandle {
    /// The remote handle, if the path lives in object storage.
    pub fn as_remote(&self) -> Option<&RemoteHandle> {
        match self {
            Self::Remote(handle) => Some(handle),
            Self::Local(_) => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.as_remote().is_some()
    }

    fn inner(&self) -> &dyn BackendHandle {
        match self {
            Self::Local(handle) => handle,
            Self::Remote(handle) => handle,
        }
    }
}

impl BackendHandle for ResolvedHandle {
    fn path(&self) -> &str {
        self.inner().path()
    }

    fn encoding(&self) -> Encoding {
        self.inner().encoding()
    }

    fn exists(&self) -> StoreResult<bool> {
        self.inner().exists()
    }

    fn open_read(&self) -> StoreResult<Box<dyn Read + Send>> {
        self.inner().open_read()
    }

    fn open_write(&self) -> StoreResult<Box<dyn StagedWrite>> {
        self.inner().open_write()
    }

    fn remove(&self) -> StoreResult<()> {
        self.inner().remove()
    }

    fn last_modified(&self) -> StoreResult<DateTime<Utc>> {
        self.inner().last_modified()
    }
}

/// Maps path schemes to remote storage clients.
///
/// Paths without a scheme resolve to local files. Paths with a scheme must
/// have a registered client.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    clients: HashMap<String, Arc<dyn ObjectStorageClient>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client for a scheme (`gs`, `s3`, ...). Replaces any
    /// previous client for the same scheme.
    pub fn register(&mut self, scheme: impl Into<String>, client: Arc<dyn ObjectStorageClient>) {
        self.clients.insert(scheme.into(), client);
    }

    /// Builder-style [`BackendRegistry::register`].
    pub fn with_client(mut self, scheme: impl Into<String>, client: Arc<dyn ObjectStorageClient>) -> Self {
        self.register(scheme, client);
        self
    }

    /// The client registered for a scheme.
    pub fn client(&self, scheme: &str) -> Option<&Arc<dyn ObjectStorageClient>> {
        self.clients.get(scheme)
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Resolve a path into a concrete handle opened with `encoding`.
    pub fn resolve(&self, path: &str, encoding: Encoding) -> StoreResult<ResolvedHandle> {
        let Some(location) = RemoteLocation::parse(path)? else {
            return Ok(ResolvedHandle::Local(LocalHandle::new(path, encoding)));
        };
        let client = self
            .clients
            .get(&location.scheme)
            .ok_or_else(|| StoreError::UnknownScheme {
                scheme: location.scheme.clone(),
                path: path.to_string(),
            })?;
        Ok(ResolvedHandle::Remote(RemoteHandle::new(
            location,
            Arc::clone(client),
            encoding,
        )))
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
