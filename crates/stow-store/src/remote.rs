use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use stow_types::RemoteLocation;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BackendHandle, Encoding, ObjectStorageClient, StagedWrite};

/// An object in remote storage, reached through an [`ObjectStorageClient`].
///
/// Writes are buffered in memory and uploaded in one `put` on commit.
#[derive(Clone)]
pub struct RemoteHandle {
    path: String,
    location: RemoteLocation,
    client: Arc<dyn ObjectStorageClient>,
    encoding: Encoding,
}

impl RemoteHandle {
    pub fn new(location: RemoteLocation, client: Arc<dyn ObjectStorageClient>, encoding: Encoding) -> Self {
        Self {
            path: location.to_string(),
            location,
            client,
            encoding,
        }
    }

    pub fn location(&self) -> &RemoteLocation {
        &self.location
    }

    pub fn client(&self) -> &Arc<dyn ObjectStorageClient> {
        &self.client
    }
}

impl BackendHandle for RemoteHandle {
    fn path(&self) -> &str {
        &self.path
    }

    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn exists(&self) -> StoreResult<bool> {
        self.client.exists(&self.location)
    }

    fn open_read(&self) -> StoreResult<Box<dyn Read + Send>> {
        let data = self.client.get(&self.location)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_write(&self) -> StoreResult<Box<dyn StagedWrite>> {
        Ok(Box::new(RemoteStagedWrite {
            buffer: Vec::new(),
            location: self.location.clone(),
            client: Arc::clone(&self.client),
            content_type: self.encoding.content_type(),
        }))
    }

    fn remove(&self) -> StoreResult<()> {
        self.client.delete(&self.location)
    }

    fn last_modified(&self) -> StoreResult<DateTime<Utc>> {
        if !self.client.exists(&self.location)? {
            return Err(StoreError::NotFound(self.path.clone()));
        }
        self.client.updated_at(&self.location)
    }
}

impl std::fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("path", &self.path)
            .field("encoding", &self.encoding)
            .finish()
    }
}

struct RemoteStagedWrite {
    buffer: Vec<u8>,
    location: RemoteLocation,
    client: Arc<dyn ObjectStorageClient>,
    content_type: &'static str,
}

impl Write for RemoteStagedWrite {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl StagedWrite for RemoteStagedWrite {
    fn commit(self: Box<Self>) -> StoreResult<()> {
        let Self {
            buffer,
            location,
            client,
            content_type,
        } = *self;
        let size = buffer.len();
        client.put(&location, buffer, content_type)?;
        tracing::debug!(%location, size, "uploaded remote artifact");
        Ok(())
    }
}
