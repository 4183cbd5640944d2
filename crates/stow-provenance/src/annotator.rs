use serde::{Deserialize, Serialize};
use stow_store::{ObjectMetadata, ObjectStorageClient, RemoteHandle};
use stow_types::{Flattenable, RemoteLocation, RequiredOutput};
use tracing::debug;

use crate::error::{AnnotationError, AnnotationResult};
use crate::labels::{merge_labels, patched_metadata, Labels};

/// Per-object custom metadata limit of Google Cloud Storage.
pub const DEFAULT_MAX_METADATA_BYTES: usize = 8 * 1024;

/// Provenance settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceConfig {
    /// Ceiling on the bytes of labels added to one object.
    pub max_metadata_bytes: usize,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            max_metadata_bytes: DEFAULT_MAX_METADATA_BYTES,
        }
    }
}

/// What to record about the run that produced an object.
#[derive(Clone, Copy, Debug, Default)]
pub struct Provenance<'a> {
    pub params: Option<&'a Labels>,
    pub labels: Option<&'a Labels>,
    pub required_outputs: Option<&'a Flattenable<RequiredOutput>>,
}

/// Result of an annotation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Annotation {
    Patched,
    Unchanged,
}

/// Attaches provenance labels to remote objects after they are written.
#[derive(Clone, Debug, Default)]
pub struct ProvenanceAnnotator {
    config: ProvenanceConfig,
}

impl ProvenanceAnnotator {
    pub fn new(config: ProvenanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProvenanceConfig {
        &self.config
    }

    /// Annotate the object behind a remote handle.
    pub fn annotate_handle(
        &self,
        handle: &RemoteHandle,
        provenance: Provenance<'_>,
    ) -> AnnotationResult<Annotation> {
        self.annotate(handle.client().as_ref(), handle.location(), provenance)
    }

    /// Read the object's metadata, merge in the provenance labels, and patch
    /// the object if anything changed.
    pub fn annotate(
        &self,
        client: &dyn ObjectStorageClient,
        location: &RemoteLocation,
        provenance: Provenance<'_>,
    ) -> AnnotationResult<Annotation> {
        let store_err = |source| AnnotationError::Store {
            path: location.to_string(),
            source,
        };
        let existing = client.get_metadata(location).map_err(store_err)?;
        let merged = merge_labels(provenance.params, provenance.labels);
        let patched = patched_metadata(
            &existing,
            &merged,
            provenance.required_outputs,
            self.config.max_metadata_bytes,
        )?;
        if patched == existing {
            debug!(path = %location, "provenance labels unchanged");
            return Ok(Annotation::Unchanged);
        }

        let patch: ObjectMetadata = patched
            .into_iter()
            .filter(|(k, v)| existing.get(k) != Some(v))
            .collect();
        client.patch_metadata(location, &patch).map_err(store_err)?;
        debug!(path = %location, labels = patch.len(), "provenance labels attached");
        Ok(Annotation::Patched)
    }
}
