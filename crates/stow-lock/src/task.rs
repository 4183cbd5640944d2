use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LockError;
use crate::provider::{LockProvider, NoopLockProvider};
use crate::scope::LockScope;

/// What a guarded dump does when the artifact already exists once the lock
/// is held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpPolicy {
    /// Another execution finished first; keep its artifact.
    #[default]
    SkipIfExists,
    /// Always write.
    Overwrite,
}

/// Result of a dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpOutcome {
    Written,
    Skipped,
}

impl DumpOutcome {
    pub fn is_written(self) -> bool {
        self == Self::Written
    }
}

/// Runs target operations inside the critical section of their scope.
///
/// Every helper acquires the scope, runs the operation, and releases on
/// return, whether the operation succeeded or not. Errors are the caller's
/// type; lock failures convert into it.
#[derive(Clone)]
pub struct TaskLock {
    provider: Arc<dyn LockProvider>,
    policy: DumpPolicy,
}

impl TaskLock {
    pub fn new(provider: Arc<dyn LockProvider>, policy: DumpPolicy) -> Self {
        Self { provider, policy }
    }

    /// No exclusion, skip-if-exists dumps.
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopLockProvider), DumpPolicy::default())
    }

    pub fn provider(&self) -> &Arc<dyn LockProvider> {
        &self.provider
    }

    pub fn policy(&self) -> DumpPolicy {
        self.policy
    }

    pub fn guard_load<T, E, F>(&self, scope: &LockScope, load: F) -> Result<T, E>
    where
        E: From<LockError>,
        F: FnOnce() -> Result<T, E>,
    {
        let _guard = self.provider.acquire(scope)?;
        debug!(scope = %scope, provider = self.provider.name(), "guarded load");
        load()
    }

    /// Run `dump` under the lock.
    ///
    /// With [`DumpPolicy::SkipIfExists`], `exists` is checked after the lock
    /// is held and the write is skipped if it returns `true`.
    pub fn guard_dump<E, X, F>(&self, scope: &LockScope, exists: X, dump: F) -> Result<DumpOutcome, E>
    where
        E: From<LockError>,
        X: FnOnce() -> Result<bool, E>,
        F: FnOnce() -> Result<(), E>,
    {
        let _guard = self.provider.acquire(scope)?;
        if self.policy == DumpPolicy::SkipIfExists && exists()? {
            debug!(scope = %scope, "artifact already exists, skipping dump");
            return Ok(DumpOutcome::Skipped);
        }
        debug!(scope = %scope, provider = self.provider.name(), "guarded dump");
        dump()?;
        Ok(DumpOutcome::Written)
    }

    pub fn guard_remove<E, F>(&self, scope: &LockScope, remove: F) -> Result<(), E>
    where
        E: From<LockError>,
        F: FnOnce() -> Result<(), E>,
    {
        let _guard = self.provider.acquire(scope)?;
        debug!(scope = %scope, provider = self.provider.name(), "guarded remove");
        remove()
    }
}

impl Default for TaskLock {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for TaskLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLock")
            .field("provider", &self.provider.name())
            .field("policy", &self.policy)
            .finish()
    }
}
