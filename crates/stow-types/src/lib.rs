//! Foundation types for stow.
//!
//! Every other stow crate depends on `stow-types` for the shared vocabulary
//! of artifact addressing.
//!
//! # Key Types
//!
//! - [`RemoteLocation`] — `scheme://bucket/key` address of a remote object
//! - [`PathDigest`] — BLAKE3 digest of a final artifact path
//! - [`RequiredOutput`] — reference to an upstream task output
//! - [`Flattenable`] — nested item/list/map structure with flattening helpers
//!
//! Path helpers live in [`path`]: run-id injection ([`path::with_run_id`])
//! and extension splitting for both local and remote paths.

pub mod digest;
pub mod error;
pub mod path;
pub mod required;

pub use digest::PathDigest;
pub use error::TypeError;
pub use path::RemoteLocation;
pub use required::{Flattenable, RequiredOutput};
