//! Label normalization, merging, and the size ceiling.

use indexmap::IndexMap;
use serde_json::Value;
use stow_store::ObjectMetadata;
use stow_types::{Flattenable, RequiredOutput};
use tracing::warn;

use crate::error::AnnotationResult;

/// Label values as supplied by callers, in insertion order.
pub type Labels = IndexMap<String, Value>;

/// Reserved metadata key holding the upstream outputs of a task.
pub const REQUIRED_OUTPUTS_KEY: &str = "__required_task_outputs";

/// Render a label value as metadata text.
///
/// Strings are kept verbatim; other values use compact JSON. `null` has no
/// rendering.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Merge run parameters with caller labels.
///
/// Labels win on key collisions. Parameters come first in their own order,
/// an overridden parameter keeps its position, then labels whose keys are
/// new follow in their order.
pub fn merge_labels(params: Option<&Labels>, labels: Option<&Labels>) -> IndexMap<String, String> {
    let mut merged = IndexMap::new();
    for (key, value) in params.into_iter().flatten() {
        if let Some(text) = render_value(value) {
            merged.insert(key.clone(), text);
        }
    }
    for (key, value) in labels.into_iter().flatten() {
        let Some(text) = render_value(value) else {
            continue;
        };
        if merged.contains_key(key) {
            warn!(label = %key, value = %text, "label overrides task parameter of the same name");
        }
        merged.insert(key.clone(), text);
    }
    merged
}

/// Metadata after adding `merged` labels and `required` outputs to
/// `existing`, keeping the added entries under `max_bytes`.
///
/// Each entry costs its key plus value length in bytes. Entries are taken in
/// order; the first one that would cross the ceiling stops all further
/// additions, the required-outputs entry included. Empty values are never
/// added.
pub fn patched_metadata(
    existing: &ObjectMetadata,
    merged: &IndexMap<String, String>,
    required: Option<&Flattenable<RequiredOutput>>,
    max_bytes: usize,
) -> AnnotationResult<ObjectMetadata> {
    let required_entry = match required.filter(|r| !r.is_empty()) {
        Some(outputs) => Some(serde_json::to_string(&outputs.flatten())?),
        None => None,
    };

    let mut patched = existing.clone();
    let mut total = 0usize;
    let entries = merged
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .chain(required_entry.as_deref().map(|v| (REQUIRED_OUTPUTS_KEY, v)));
    for (key, value) in entries {
        if value.is_empty() {
            continue;
        }
        let size = key.len() + value.len();
        if total + size > max_bytes {
            warn!(
                total_bytes = total,
                max_bytes,
                skipped = %key,
                "metadata size ceiling reached, no more labels added"
            );
            break;
        }
        total += size;
        patched.insert(key.to_string(), value.to_string());
    }
    Ok(patched)
}
