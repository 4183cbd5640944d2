use std::sync::Arc;

use stow_types::path::file_name;

use crate::error::{CodecError, CodecResult};
use crate::processor::{
    BinaryProcessor, JsonLinesTableProcessor, JsonObjectProcessor, PackedTableProcessor, Processor,
    TextProcessor,
};

/// Maps file-name suffixes to processors.
///
/// Matching is case-insensitive on the final path component. When several
/// suffixes match, the longest wins; among equal lengths, the most recent
/// registration wins.
#[derive(Clone)]
pub struct ProcessorRegistry {
    entries: Vec<(String, Arc<dyn Processor>)>,
}

impl ProcessorRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The built-in extension table.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let text: Arc<dyn Processor> = Arc::new(TextProcessor);
        let binary: Arc<dyn Processor> = Arc::new(BinaryProcessor);
        let jsonl: Arc<dyn Processor> = Arc::new(JsonLinesTableProcessor);
        for ext in [".txt", ".log", ".md"] {
            registry.register(ext, Arc::clone(&text));
        }
        for ext in [".bin", ".dat"] {
            registry.register(ext, Arc::clone(&binary));
        }
        registry.register(".json", Arc::new(JsonObjectProcessor));
        for ext in [".jsonl", ".ndjson"] {
            registry.register(ext, Arc::clone(&jsonl));
        }
        registry.register(".tbl", Arc::new(PackedTableProcessor));
        registry
    }

    /// Register a processor for a suffix such as `.csv` or `.tar.zst`.
    pub fn register(&mut self, suffix: impl Into<String>, processor: Arc<dyn Processor>) {
        self.entries.push((suffix.into().to_ascii_lowercase(), processor));
    }

    /// Find the processor for a path.
    pub fn resolve(&self, path: &str) -> CodecResult<Arc<dyn Processor>> {
        let name = file_name(path).to_ascii_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, (suffix, _))| name.len() > suffix.len() && name.ends_with(suffix.as_str()))
            .max_by_key(|(idx, (suffix, _))| (suffix.len(), *idx))
            .map(|(_, (_, processor))| Arc::clone(processor))
            .ok_or_else(|| CodecError::UnknownExtension {
                path: path.to_string(),
            })
    }

    /// Registered suffixes in registration order.
    pub fn suffixes(&self) -> Vec<&str> {
        self.entries.iter().map(|(s, _)| s.as_str()).collect()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("suffixes", &self.suffixes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_extensions() {
        let registry = ProcessorRegistry::with_defaults();
        let cases = [
            ("out/a.txt", "text"),
            ("a/b.dat", "binary"),
            ("gs://bkt/x/model.json", "json"),
            ("rows.jsonl", "jsonl-table"),
            ("rows.NDJSON", "jsonl-table"),
            ("frame.tbl", "packed-table"),
        ];
        for (path, expected) in cases {
            assert_eq!(registry.resolve(path).unwrap().name(), expected, "{path}");
        }
    }

    #[test]
    fn unknown_extension_fails() {
        let registry = ProcessorRegistry::with_defaults();
        let err = registry.resolve("data.parquet").err().unwrap();
        assert!(matches!(err, CodecError::UnknownExtension { .. }));
        assert!(registry.resolve("no_extension").is_err());
    }

    #[test]
    fn bare_suffix_is_not_a_match() {
        let registry = ProcessorRegistry::with_defaults();
        assert!(registry.resolve("dir/.json").is_err());
    }

    #[test]
    fn longest_suffix_wins() {
        let mut registry = ProcessorRegistry::with_defaults();
        registry.register(".tbl.bin", Arc::new(PackedTableProcessor));
        assert_eq!(registry.resolve("x.tbl.bin").unwrap().name(), "packed-table");
        assert_eq!(registry.resolve("x.bin").unwrap().name(), "binary");
    }

    #[test]
    fn later_registration_wins() {
        let mut registry = ProcessorRegistry::with_defaults();
        registry.register(".txt", Arc::new(BinaryProcessor));
        assert_eq!(registry.resolve("a.txt").unwrap().name(), "binary");
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        assert!(ProcessorRegistry::empty().resolve("a.txt").is_err());
    }
}
