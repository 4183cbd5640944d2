use std::fmt;

use crate::error::LockResult;
use crate::scope::LockScope;

/// Exclusive hold on a [`LockScope`]. The lock is released when the guard
/// is dropped.
pub struct LockGuard {
    scope: LockScope,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LockGuard {
    /// A guard that runs `release` when dropped.
    pub fn new(scope: LockScope, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            scope,
            release: Some(Box::new(release)),
        }
    }

    /// A guard that holds nothing.
    pub fn unlocked(scope: LockScope) -> Self {
        Self {
            scope,
            release: None,
        }
    }

    pub fn scope(&self) -> &LockScope {
        &self.scope
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("scope", &self.scope)
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// Source of mutual exclusion between executions touching the same artifact.
///
/// `acquire` blocks until the scope is free or the provider gives up.
pub trait LockProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn acquire(&self, scope: &LockScope) -> LockResult<LockGuard>;
}

/// Provider that never excludes anything.
///
/// Used when no lock backend is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLockProvider;

impl LockProvider for NoopLockProvider {
    fn name(&self) -> &'static str {
        "none"
    }

    fn acquire(&self, scope: &LockScope) -> LockResult<LockGuard> {
        Ok(LockGuard::unlocked(scope.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn guard_releases_on_drop() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);
        let guard = LockGuard::new(LockScope::named("s"), move || flag.store(true, Ordering::SeqCst));
        assert!(!released.load(Ordering::SeqCst));
        drop(guard);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn noop_never_blocks() {
        let scope = LockScope::named("s");
        let a = NoopLockProvider.acquire(&scope).unwrap();
        let b = NoopLockProvider.acquire(&scope).unwrap();
        assert_eq!(a.scope(), b.scope());
    }
}
