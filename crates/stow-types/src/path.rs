//! Artifact path helpers.
//!
//! Paths are plain strings: either a local filesystem path or a remote object
//! address of the form `scheme://bucket/key`. Nothing here touches storage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const SCHEME_SEPARATOR: &str = "://";

/// Split a path into `(base, extension)` the way `splitext` does.
///
/// The extension is the suffix starting at the last `.` of the final path
/// component. Leading dots of the component never start an extension, so
/// `.profile` has no extension.
pub fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &path[name_start..];
    let stem_start = name.len() - name.trim_start_matches('.').len();
    match name[stem_start..].rfind('.') {
        Some(dot) => path.split_at(name_start + stem_start + dot),
        None => (path, ""),
    }
}

/// Inject a run identifier before the file extension.
///
/// `a/b.dat` with run id `42` becomes `a/b_42.dat`. Without a run id the
/// path is returned unchanged.
pub fn with_run_id(path: &str, run_id: Option<&str>) -> String {
    match run_id {
        Some(id) => {
            let (base, ext) = split_extension(path);
            format!("{base}_{id}{ext}")
        }
        None => path.to_string(),
    }
}

/// The final path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Address of an object in remote object storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteLocation {
    pub scheme: String,
    pub bucket: String,
    pub key: String,
}

impl RemoteLocation {
    /// Parse a `scheme://bucket/key` path.
    ///
    /// Returns `Ok(None)` for paths without a scheme (local paths) and an
    /// error for remote paths missing a bucket or key.
    pub fn parse(path: &str) -> Result<Option<Self>, TypeError> {
        let Some(scheme_end) = path.find(SCHEME_SEPARATOR) else {
            return Ok(None);
        };
        let scheme = &path[..scheme_end];
        let rest = &path[scheme_end + SCHEME_SEPARATOR.len()..];
        let malformed = |reason: &str| TypeError::MalformedRemotePath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if scheme.is_empty() {
            return Err(malformed("empty scheme"));
        }
        let (bucket, key) = rest.split_once('/').ok_or_else(|| malformed("missing object key"))?;
        if bucket.is_empty() {
            return Err(malformed("empty bucket"));
        }
        if key.is_empty() || key.ends_with('/') {
            return Err(malformed("object key must name a file"));
        }

        Ok(Some(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        }))
    }
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn split_simple_extension() {
        assert_eq!(split_extension("a/b.dat"), ("a/b", ".dat"));
        assert_eq!(split_extension("b.tar.zst"), ("b.tar", ".zst"));
    }

    #[test]
    fn split_without_extension() {
        assert_eq!(split_extension("a/b"), ("a/b", ""));
        assert_eq!(split_extension("a.d/b"), ("a.d/b", ""));
        assert_eq!(split_extension("a/.profile"), ("a/.profile", ""));
    }

    #[test]
    fn run_id_goes_before_extension() {
        assert_eq!(with_run_id("a/b.dat", Some("42")), "a/b_42.dat");
        assert_eq!(with_run_id("gs://bkt/x/y.json", Some("7")), "gs://bkt/x/y_7.json");
        assert_eq!(with_run_id("a/noext", Some("1")), "a/noext_1");
    }

    #[test]
    fn no_run_id_keeps_path() {
        assert_eq!(with_run_id("a/b.dat", None), "a/b.dat");
    }

    #[test]
    fn run_id_disambiguation_is_stable() {
        let first = with_run_id("a/b.dat", Some("42"));
        let second = with_run_id("a/b.dat", Some("42"));
        assert_eq!(first, second);
        assert_ne!(first, with_run_id("a/b.dat", None));
    }

    #[test]
    fn parse_remote_location() {
        let loc = RemoteLocation::parse("gs://bucket/dir/obj.json").unwrap().unwrap();
        assert_eq!(loc.scheme, "gs");
        assert_eq!(loc.bucket, "bucket");
        assert_eq!(loc.key, "dir/obj.json");
        assert_eq!(loc.to_string(), "gs://bucket/dir/obj.json");
    }

    #[test]
    fn local_path_is_not_remote() {
        assert!(RemoteLocation::parse("/tmp/out.json").unwrap().is_none());
        assert!(RemoteLocation::parse("relative/out.json").unwrap().is_none());
    }

    #[test]
    fn malformed_remote_paths() {
        for bad in ["gs://", "gs://bucket", "gs:///key", "gs://bucket/", "://bucket/key"] {
            let err = RemoteLocation::parse(bad).unwrap_err();
            assert!(matches!(err, TypeError::MalformedRemotePath { .. }), "{bad}");
        }
    }

    #[test]
    fn file_name_of_paths() {
        assert_eq!(file_name("a/b/c.txt"), "c.txt");
        assert_eq!(file_name("c.txt"), "c.txt");
    }

    proptest! {
        #[test]
        fn run_id_only_touches_file_name(
            dir in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
            stem in "[a-z]{1,8}",
            ext in "(\\.[a-z]{1,4})?",
            id in "[0-9]{1,6}",
        ) {
            let path = format!("{dir}/{stem}{ext}");
            let out = with_run_id(&path, Some(&id));
            prop_assert_eq!(out, format!("{dir}/{stem}_{id}{ext}"));
            prop_assert_eq!(split_extension(&path).1, ext.as_str());
        }
    }
}
