use std::path::{Path, PathBuf};
use std::sync::Arc;

use stow_codec::{Artifact, Processor, ProcessorRegistry, Table};
use stow_lock::{LockScope, TaskLock};
use stow_provenance::ProvenanceAnnotator;
use stow_store::{BackendRegistry, Encoding, ObjectStorageClient, ResolvedHandle};
use stow_types::path::with_run_id;
use stow_types::PathDigest;
use tracing::debug;

use crate::config::StowConfig;
use crate::error::TargetResult;
use crate::model::{ModelCodec, ModelTarget};
use crate::single_file::SingleFileTarget;
use crate::target::{Target, TargetVariant};

/// Per-target options.
#[derive(Clone, Default)]
pub struct TargetOptions {
    /// Injected before the file extension to keep runs apart.
    pub run_id: Option<String>,
    /// Overrides the processor inferred from the extension.
    pub processor: Option<Arc<dyn Processor>>,
    /// Overrides the lock scope derived from the final path.
    pub lock_scope: Option<LockScope>,
}

impl TargetOptions {
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn with_lock_scope(mut self, scope: LockScope) -> Self {
        self.lock_scope = Some(scope);
        self
    }
}

impl std::fmt::Debug for TargetOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetOptions")
            .field("run_id", &self.run_id)
            .field("processor", &self.processor.as_ref().map(|p| p.name()))
            .field("lock_scope", &self.lock_scope)
            .finish()
    }
}

/// Builds targets from logical paths.
///
/// Holds the registries and lock shared by every target it makes. Targets
/// are constructed fresh per call and keep no link back to the factory.
#[derive(Clone, Debug)]
pub struct TargetFactory {
    backends: BackendRegistry,
    processors: ProcessorRegistry,
    lock: TaskLock,
    annotator: ProvenanceAnnotator,
    scratch_root: PathBuf,
    chunk_max_bytes: u64,
}

impl Default for TargetFactory {
    fn default() -> Self {
        Self::from_config(&StowConfig::default())
    }
}

impl TargetFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &StowConfig) -> Self {
        Self {
            backends: BackendRegistry::new(),
            processors: ProcessorRegistry::with_defaults(),
            lock: config.lock.task_lock(),
            annotator: ProvenanceAnnotator::new(config.provenance.clone()),
            scratch_root: config.scratch_root.clone(),
            chunk_max_bytes: config.chunking.max_bytes,
        }
    }

    /// Route `scheme://` paths to `client`.
    pub fn with_remote_client(mut self, scheme: impl Into<String>, client: Arc<dyn ObjectStorageClient>) -> Self {
        self.backends.register(scheme, client);
        self
    }

    /// Handle files ending in `suffix` with `processor`.
    pub fn with_processor(mut self, suffix: impl Into<String>, processor: Arc<dyn Processor>) -> Self {
        self.processors.register(suffix, processor);
        self
    }

    pub fn with_lock(mut self, lock: TaskLock) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_annotator(mut self, annotator: ProvenanceAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    /// Default scratch root, from configuration.
    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Default fragment ceiling for large tables, from configuration.
    pub fn chunk_max_bytes(&self) -> u64 {
        self.chunk_max_bytes
    }

    pub fn lock(&self) -> &TaskLock {
        &self.lock
    }

    /// A single-file target for `path`.
    pub fn make_target(&self, path: &str, options: TargetOptions) -> TargetResult<Target<Artifact>> {
        let final_path = with_run_id(path, options.run_id.as_deref());
        let scope = Self::scope_for(&final_path, &options);
        let processor = match options.processor {
            Some(processor) => processor,
            None => self.processors.resolve(&final_path)?,
        };
        let handle = self.backends.resolve(&final_path, processor.encoding())?;
        debug!(path = %final_path, processor = processor.name(), remote = handle.is_remote(), "made target");
        Ok(self.finish(Box::new(SingleFileTarget::new(handle.clone(), processor)), scope, &handle))
    }

    /// An archived model target for `path`, unpacked under `scratch_root`
    /// when saving or loading.
    pub fn make_model_target<M: 'static>(
        &self,
        path: &str,
        scratch_root: impl AsRef<Path>,
        codec: ModelCodec<M>,
        options: TargetOptions,
    ) -> TargetResult<Target<M>> {
        let final_path = with_run_id(path, options.run_id.as_deref());
        let scope = Self::scope_for(&final_path, &options);
        let scratch = scratch_root
            .as_ref()
            .join(PathDigest::of_path(&final_path).to_hex());
        let handle = self.backends.resolve(&final_path, Encoding::Binary)?;
        debug!(path = %final_path, scratch = %scratch.display(), "made model target");
        Ok(self.finish(Box::new(ModelTarget::new(handle.clone(), scratch, codec)), scope, &handle))
    }

    /// A table target stored as an archive of fragments no larger than
    /// `max_bytes` each.
    pub fn make_large_table_target(
        &self,
        path: &str,
        scratch_root: impl AsRef<Path>,
        max_bytes: u64,
        options: TargetOptions,
    ) -> TargetResult<Target<Table>> {
        self.make_model_target(path, scratch_root, ModelCodec::chunked_table(max_bytes)?, options)
    }

    fn scope_for(final_path: &str, options: &TargetOptions) -> LockScope {
        options
            .lock_scope
            .clone()
            .unwrap_or_else(|| LockScope::derive(final_path, options.run_id.as_deref()))
    }

    /// Remote targets get the annotator; local ones have nothing to label.
    fn finish<V>(&self, variant: Box<dyn TargetVariant<V>>, scope: LockScope, handle: &ResolvedHandle) -> Target<V> {
        let target = Target::new(variant, self.lock.clone(), scope);
        if handle.is_remote() {
            target.with_annotator(self.annotator.clone())
        } else {
            target
        }
    }
}
