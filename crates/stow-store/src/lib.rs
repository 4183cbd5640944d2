//! Backend handles for stow.
//!
//! A backend handle is the storage primitive behind a target: it can tell
//! whether its artifact exists, stream it in, stage a replacement, remove it,
//! and report when it was last modified. Handles never interpret the bytes
//! they move.
//!
//! # Backends
//!
//! - [`LocalHandle`] -- a file on the local filesystem, written atomically
//!   through a temp file in the same directory
//! - [`RemoteHandle`] -- an object behind an [`ObjectStorageClient`],
//!   uploaded on commit
//!
//! [`BackendRegistry`] resolves a path to one of the two by its shape:
//! `scheme://bucket/key` with a registered scheme is remote, anything without
//! a scheme is local.
//!
//! [`InMemoryObjectStorage`] implements the remote client interface for tests
//! and embedding.

pub mod error;
pub mod local;
pub mod memory;
pub mod registry;
pub mod remote;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use local::LocalHandle;
pub use memory::InMemoryObjectStorage;
pub use registry::{BackendRegistry, ResolvedHandle};
pub use remote::RemoteHandle;
pub use traits::{BackendHandle, Encoding, ObjectMetadata, ObjectStorageClient, StagedWrite};
