//! Provenance labels for remote objects.
//!
//! After a target writes to object storage, the [`ProvenanceAnnotator`]
//! records how the object was produced: the task's parameters, any labels
//! the caller supplied, and the upstream outputs the task consumed. Labels
//! are merged into the object's existing custom metadata with a patch, under
//! a byte ceiling (8 KiB by default, the GCS limit).
//!
//! Annotation is best effort. Callers log an [`AnnotationError`] and carry on.

pub mod annotator;
pub mod error;
pub mod labels;

pub use annotator::{
    Annotation, Provenance, ProvenanceAnnotator, ProvenanceConfig, DEFAULT_MAX_METADATA_BYTES,
};
pub use error::{AnnotationError, AnnotationResult};
pub use labels::{merge_labels, patched_metadata, render_value, Labels, REQUIRED_OUTPUTS_KEY};
