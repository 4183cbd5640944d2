use std::fmt;

use serde::{Deserialize, Serialize};
use stow_types::path::{file_name, split_extension};

const LOCK_DOMAIN: &str = "stow-lock-v1";

/// Key naming the critical section of one artifact.
///
/// Derived from the final artifact path and run id: a readable stem taken
/// from the file name, plus a short BLAKE3 suffix that keeps distinct paths
/// apart. The key only contains `[A-Za-z0-9._-]` so it can name a file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockScope(String);

impl LockScope {
    /// Derive the scope for a final artifact path.
    pub fn derive(final_path: &str, run_id: Option<&str>) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(LOCK_DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(final_path.as_bytes());
        if let Some(id) = run_id {
            hasher.update(b"\0");
            hasher.update(id.as_bytes());
        }
        let hash = hasher.finalize();

        let (stem, _) = split_extension(file_name(final_path));
        let stem = sanitize(stem);
        let short = hex::encode(&hash.as_bytes()[..4]);
        if stem.is_empty() {
            Self(short)
        } else {
            Self(format!("{stem}-{short}"))
        }
    }

    /// A caller-chosen scope. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn named(name: &str) -> Self {
        Self(sanitize(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(
            LockScope::derive("out/model_7.bin", Some("7")),
            LockScope::derive("out/model_7.bin", Some("7"))
        );
    }

    #[test]
    fn derive_keeps_readable_stem() {
        let scope = LockScope::derive("gs://bkt/out/model.bin", None);
        assert!(scope.as_str().starts_with("model-"), "{scope}");
        assert_eq!(scope.as_str().len(), "model-".len() + 8);
    }

    #[test]
    fn distinct_paths_get_distinct_scopes() {
        let a = LockScope::derive("a/model.bin", None);
        let b = LockScope::derive("b/model.bin", None);
        assert_ne!(a, b);
        assert_ne!(a, LockScope::derive("a/model.bin", Some("1")));
    }

    #[test]
    fn scope_is_filename_safe() {
        let scope = LockScope::derive("out/we ird:name.json", None);
        assert!(scope
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
        assert_eq!(LockScope::named("a/b c").as_str(), "a_b_c");
    }

    #[test]
    fn dotfile_without_stem_still_hashes() {
        let scope = LockScope::derive("out/.hidden", None);
        assert!(scope.as_str().starts_with(".hidden-"), "{scope}");
    }
}
