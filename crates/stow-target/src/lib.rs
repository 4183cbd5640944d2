//! Persistence targets for pipeline stages.
//!
//! A [`Target`] is a handle on one named artifact: a table, a JSON object,
//! text, bytes, or a packaged model. Targets read and write local files or
//! objects in remote storage through the same interface, and every `load`,
//! `remove`, and (by default) `dump` runs inside a per-artifact lock so two
//! executions of one pipeline step cannot corrupt or double-write it.
//!
//! # Variants
//!
//! - [`SingleFileTarget`] -- one file encoded by a format processor
//! - [`ModelTarget`] -- a model saved into a scratch directory and archived
//!   as one zstd-compressed tar
//!
//! Large tables use a model target whose save strategy splits the table into
//! fragments ([`TargetFactory::make_large_table_target`]).
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use stow_codec::Artifact;
//! use stow_target::{DumpOptions, TargetFactory, TargetOptions};
//!
//! let factory = TargetFactory::new();
//! let target = factory
//!     .make_target("out/summary.json", TargetOptions::default().with_run_id("42"))
//!     .unwrap();
//! target
//!     .dump(&Artifact::from(json!({"rows": 10})), &DumpOptions::default())
//!     .unwrap();
//! assert_eq!(target.path(), "out/summary_42.json");
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod factory;
pub mod logging;
pub mod model;
pub mod single_file;
pub mod target;

pub use config::{ChunkingConfig, StowConfig};
pub use error::{TargetError, TargetResult};
pub use factory::{TargetFactory, TargetOptions};
pub use logging::{init_logging, init_logging_from, LogFormat};
pub use model::{LoadFn, LoaderRegistry, ModelCodec, ModelTarget, SaveFn, CHUNKED_TABLE_LOADER};
pub use single_file::SingleFileTarget;
pub use target::{DumpOptions, Target, TargetVariant};

pub use stow_lock::{DumpOutcome, DumpPolicy, LockScope, TaskLock};
