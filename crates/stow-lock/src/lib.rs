//! Lock protocol for stow.
//!
//! Two executions of the same pipeline step must never load, write, or
//! remove one artifact at the same time. Each artifact gets a
//! [`LockScope`]; a [`LockProvider`] turns a scope into an exclusive
//! [`LockGuard`]; [`TaskLock`] wraps target operations so they only run
//! while the guard is held.
//!
//! # Providers
//!
//! - [`NoopLockProvider`] -- no exclusion, the default when nothing is configured
//! - [`InProcessLockProvider`] -- threads of one process
//! - [`FileLockProvider`] -- advisory locks on files in a shared directory

pub mod config;
pub mod error;
pub mod file;
pub mod in_process;
pub mod provider;
pub mod scope;
pub mod task;

pub use config::{LockConfig, LockProviderKind};
pub use error::{LockError, LockResult};
pub use file::FileLockProvider;
pub use in_process::InProcessLockProvider;
pub use provider::{LockGuard, LockProvider, NoopLockProvider};
pub use scope::LockScope;
pub use task::{DumpOutcome, DumpPolicy, TaskLock};
