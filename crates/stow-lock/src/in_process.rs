use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{LockError, LockResult};
use crate::provider::{LockGuard, LockProvider};
use crate::scope::LockScope;

#[derive(Default)]
struct Held {
    scopes: Mutex<HashSet<LockScope>>,
    released: Condvar,
}

/// Mutual exclusion between threads of one process.
///
/// Waits up to `timeout` for a held scope, then fails with
/// [`LockError::Timeout`].
#[derive(Clone)]
pub struct InProcessLockProvider {
    held: Arc<Held>,
    timeout: Duration,
}

impl InProcessLockProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Arc::new(Held::default()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` if some guard currently holds `scope`.
    pub fn is_held(&self, scope: &LockScope) -> bool {
        self.held.scopes.lock().expect("lock poisoned").contains(scope)
    }
}

impl LockProvider for InProcessLockProvider {
    fn name(&self) -> &'static str {
        "in_process"
    }

    fn acquire(&self, scope: &LockScope) -> LockResult<LockGuard> {
        let started = Instant::now();
        let mut scopes = self.held.scopes.lock().expect("lock poisoned");
        while scopes.contains(scope) {
            let waited = started.elapsed();
            let Some(remaining) = self.timeout.checked_sub(waited).filter(|d| !d.is_zero()) else {
                return Err(LockError::Timeout {
                    scope: scope.to_string(),
                    waited,
                });
            };
            scopes = self
                .held
                .released
                .wait_timeout(scopes, remaining)
                .expect("lock poisoned")
                .0;
        }
        scopes.insert(scope.clone());
        debug!(scope = %scope, "in-process lock acquired");

        let held = Arc::clone(&self.held);
        let owned = scope.clone();
        Ok(LockGuard::new(scope.clone(), move || {
            held.scopes.lock().expect("lock poisoned").remove(&owned);
            held.released.notify_all();
        }))
    }
}

impl std::fmt::Debug for InProcessLockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessLockProvider")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn second_acquire_times_out_while_held() {
        let provider = InProcessLockProvider::new(Duration::from_millis(50));
        let scope = LockScope::named("model");
        let _guard = provider.acquire(&scope).unwrap();
        assert!(provider.is_held(&scope));

        let err = provider.acquire(&scope).unwrap_err();
        assert!(matches!(err, LockError::Timeout { .. }));
    }

    #[test]
    fn release_allows_reacquire() {
        let provider = InProcessLockProvider::new(Duration::from_millis(50));
        let scope = LockScope::named("model");
        drop(provider.acquire(&scope).unwrap());
        assert!(!provider.is_held(&scope));
        assert!(provider.acquire(&scope).is_ok());
    }

    #[test]
    fn different_scopes_do_not_contend() {
        let provider = InProcessLockProvider::new(Duration::from_millis(10));
        let _a = provider.acquire(&LockScope::named("a")).unwrap();
        assert!(provider.acquire(&LockScope::named("b")).is_ok());
    }

    #[test]
    fn threads_never_overlap_in_one_scope() {
        let provider = InProcessLockProvider::new(Duration::from_secs(10));
        let scope = LockScope::named("shared");
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let provider = provider.clone();
                let scope = scope.clone();
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..5 {
                        let _guard = provider.acquire(&scope).unwrap();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(1));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
