//! Format processors for stow.
//!
//! A [`Processor`] turns an in-memory [`Artifact`] into bytes and back. The
//! [`ProcessorRegistry`] picks one from a path's file extension:
//!
//! | Extension | Processor |
//! |---|---|
//! | `.txt`, `.log`, `.md` | [`TextProcessor`] |
//! | `.bin`, `.dat` | [`BinaryProcessor`] |
//! | `.json` | [`JsonObjectProcessor`] |
//! | `.jsonl`, `.ndjson` | [`JsonLinesTableProcessor`] |
//! | `.tbl` | [`PackedTableProcessor`] |
//!
//! [`ChunkedTableSerializer`] stores tables too large for one file as a set
//! of `fragment_<n>` files in a directory.

pub mod artifact;
pub mod chunked;
pub mod error;
pub mod processor;
pub mod registry;

pub use artifact::{Artifact, ArtifactKind, Cell, Table};
pub use chunked::{partition, ChunkedTableSerializer, FRAGMENT_PREFIX};
pub use error::{CodecError, CodecResult};
pub use processor::{
    BinaryProcessor, JsonLinesTableProcessor, JsonObjectProcessor, PackedTableProcessor, Processor,
    TextProcessor,
};
pub use registry::ProcessorRegistry;
