use std::sync::Arc;

use chrono::{DateTime, Utc};
use stow_codec::{Artifact, Processor};
use stow_store::{BackendHandle, RemoteHandle, ResolvedHandle};
use tracing::debug;

use crate::error::TargetResult;
use crate::target::TargetVariant;

/// One artifact in one file, encoded by one processor.
#[derive(Clone)]
pub struct SingleFileTarget {
    handle: ResolvedHandle,
    processor: Arc<dyn Processor>,
}

impl SingleFileTarget {
    pub fn new(handle: ResolvedHandle, processor: Arc<dyn Processor>) -> Self {
        Self { handle, processor }
    }

    pub fn handle(&self) -> &ResolvedHandle {
        &self.handle
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.processor
    }
}

impl TargetVariant<Artifact> for SingleFileTarget {
    fn exists(&self) -> TargetResult<bool> {
        Ok(self.handle.exists()?)
    }

    fn load(&self) -> TargetResult<Artifact> {
        let mut reader = self.handle.open_read()?;
        let artifact = self.processor.load(&mut reader)?;
        debug!(path = self.handle.path(), processor = self.processor.name(), "loaded artifact");
        Ok(artifact)
    }

    /// The staged write is dropped uncommitted if encoding fails, so a
    /// failed dump leaves any previous artifact in place.
    fn dump(&self, value: &Artifact) -> TargetResult<()> {
        let mut writer = self.handle.open_write()?;
        self.processor.dump(value, &mut writer)?;
        writer.commit()?;
        debug!(path = self.handle.path(), processor = self.processor.name(), "dumped artifact");
        Ok(())
    }

    fn remove(&self) -> TargetResult<()> {
        Ok(self.handle.remove()?)
    }

    fn path(&self) -> &str {
        self.handle.path()
    }

    fn last_modification_time(&self) -> TargetResult<DateTime<Utc>> {
        Ok(self.handle.last_modified()?)
    }

    fn remote_handle(&self) -> Option<&RemoteHandle> {
        self.handle.as_remote()
    }
}

impl std::fmt::Debug for SingleFileTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFileTarget")
            .field("path", &self.handle.path())
            .field("processor", &self.processor.name())
            .finish()
    }
}
