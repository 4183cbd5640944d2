//! The target contract shared by every persistence variant.

use chrono::{DateTime, Utc};
use stow_lock::{DumpOutcome, LockScope, TaskLock};
use stow_provenance::{Labels, Provenance, ProvenanceAnnotator};
use stow_store::RemoteHandle;
use stow_types::{Flattenable, RequiredOutput};
use tracing::{debug, warn};

use crate::error::TargetResult;

/// Storage-specific half of a target.
///
/// Implementations do the raw I/O. Locking and provenance belong to
/// [`Target`], which wraps every call.
pub trait TargetVariant<V>: Send + Sync {
    fn exists(&self) -> TargetResult<bool>;

    fn load(&self) -> TargetResult<V>;

    fn dump(&self, value: &V) -> TargetResult<()>;

    fn remove(&self) -> TargetResult<()>;

    fn path(&self) -> &str;

    fn last_modification_time(&self) -> TargetResult<DateTime<Utc>>;

    /// The remote object written by `dump`, if it lives in object storage.
    fn remote_handle(&self) -> Option<&RemoteHandle> {
        None
    }
}

/// Options for [`Target::dump`].
#[derive(Clone, Debug)]
pub struct DumpOptions {
    /// Run the write inside the artifact's lock.
    pub lock_at_dump: bool,
    /// Task parameters recorded as provenance labels.
    pub params: Option<Labels>,
    /// Caller labels; these override parameters with the same name.
    pub labels: Option<Labels>,
    /// Upstream outputs the task consumed.
    pub required_outputs: Option<Flattenable<RequiredOutput>>,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            lock_at_dump: true,
            params: None,
            labels: None,
            required_outputs: None,
        }
    }
}

impl DumpOptions {
    /// Write without taking the lock.
    pub fn unlocked() -> Self {
        Self {
            lock_at_dump: false,
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: Labels) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_required_outputs(mut self, outputs: Flattenable<RequiredOutput>) -> Self {
        self.required_outputs = Some(outputs);
        self
    }

    fn provenance(&self) -> Provenance<'_> {
        Provenance {
            params: self.params.as_ref(),
            labels: self.labels.as_ref(),
            required_outputs: self.required_outputs.as_ref(),
        }
    }
}

/// A handle on one persisted artifact.
///
/// The path is fixed at construction. Nothing is cached: every `load` reads
/// storage again. `load`, `remove`, and by default `dump` run inside the
/// artifact's lock scope.
pub struct Target<V> {
    variant: Box<dyn TargetVariant<V>>,
    lock: TaskLock,
    scope: LockScope,
    annotator: Option<ProvenanceAnnotator>,
}

impl<V> Target<V> {
    pub fn new(variant: Box<dyn TargetVariant<V>>, lock: TaskLock, scope: LockScope) -> Self {
        Self {
            variant,
            lock,
            scope,
            annotator: None,
        }
    }

    /// Attach provenance labels to remote objects after each write.
    pub fn with_annotator(mut self, annotator: ProvenanceAnnotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    pub fn path(&self) -> &str {
        self.variant.path()
    }

    pub fn lock_scope(&self) -> &LockScope {
        &self.scope
    }

    pub fn exists(&self) -> TargetResult<bool> {
        self.variant.exists()
    }

    pub fn load(&self) -> TargetResult<V> {
        self.lock.guard_load(&self.scope, || self.variant.load())
    }

    pub fn dump(&self, value: &V, options: &DumpOptions) -> TargetResult<DumpOutcome> {
        let write = || -> TargetResult<()> {
            self.variant.dump(value)?;
            self.annotate(options);
            Ok(())
        };
        if options.lock_at_dump {
            self.lock
                .guard_dump(&self.scope, || self.variant.exists(), write)
        } else {
            write()?;
            Ok(DumpOutcome::Written)
        }
    }

    /// Remove the artifact. Removing a missing artifact succeeds.
    pub fn remove(&self) -> TargetResult<()> {
        if !self.variant.exists()? {
            debug!(path = self.path(), "nothing to remove");
            return Ok(());
        }
        self.lock.guard_remove(&self.scope, || self.variant.remove())
    }

    pub fn last_modification_time(&self) -> TargetResult<DateTime<Utc>> {
        self.variant.last_modification_time()
    }

    fn annotate(&self, options: &DumpOptions) {
        let (Some(annotator), Some(handle)) = (&self.annotator, self.variant.remote_handle()) else {
            return;
        };
        if let Err(e) = annotator.annotate_handle(handle, options.provenance()) {
            warn!(path = self.path(), error = %e, "failed to attach provenance labels");
        }
    }
}

impl<V> std::fmt::Debug for Target<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("path", &self.path())
            .field("scope", &self.scope)
            .field("lock", &self.lock)
            .field("annotated", &self.annotator.is_some())
            .finish()
    }
}
