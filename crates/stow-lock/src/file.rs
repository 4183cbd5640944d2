use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::{LockError, LockResult};
use crate::provider::{LockGuard, LockProvider};
use crate::scope::LockScope;

/// Advisory file locks shared by every process that sees `lock_dir`.
///
/// Each scope maps to `<lock_dir>/<scope>.lock`. Lock files are left in
/// place after release; only the advisory lock on them matters.
#[derive(Clone, Debug)]
pub struct FileLockProvider {
    lock_dir: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

impl FileLockProvider {
    pub fn new(lock_dir: impl Into<PathBuf>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            timeout,
            poll_interval,
        }
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Path of the lock file backing `scope`.
    pub fn lock_path(&self, scope: &LockScope) -> PathBuf {
        self.lock_dir.join(format!("{scope}.lock"))
    }

    fn open(&self, path: &Path) -> LockResult<File> {
        let io_err = |source| LockError::LockFile {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.lock_dir).map_err(io_err)?;
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl LockProvider for FileLockProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    fn acquire(&self, scope: &LockScope) -> LockResult<LockGuard> {
        let path = self.lock_path(scope);
        let file = self.open(&path)?;
        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(e) if is_contended(&e) => {
                    let waited = started.elapsed();
                    if waited >= self.timeout {
                        return Err(LockError::Timeout {
                            scope: scope.to_string(),
                            waited,
                        });
                    }
                    thread::sleep(self.poll_interval.min(self.timeout - waited));
                }
                Err(source) => return Err(LockError::LockFile { path, source }),
            }
        }
        debug!(scope = %scope, path = %path.display(), "file lock acquired");

        Ok(LockGuard::new(scope.clone(), move || {
            if let Err(e) = FileExt::unlock(&file) {
                warn!(path = %path.display(), error = %e, "failed to release file lock");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(dir: &Path) -> FileLockProvider {
        FileLockProvider::new(dir, Duration::from_millis(60), Duration::from_millis(5))
    }

    #[test]
    fn lock_file_named_after_scope() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path());
        let scope = LockScope::named("model-abcd1234");
        let _guard = provider.acquire(&scope).unwrap();
        assert!(dir.path().join("model-abcd1234.lock").is_file());
    }

    #[test]
    fn contended_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path());
        let scope = LockScope::named("model");
        let _guard = provider.acquire(&scope).unwrap();

        let started = Instant::now();
        let err = provider.acquire(&scope).unwrap_err();
        assert!(matches!(err, LockError::Timeout { .. }));
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn released_lock_can_be_taken_again() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(dir.path());
        let scope = LockScope::named("model");
        drop(provider.acquire(&scope).unwrap());
        assert!(provider.acquire(&scope).is_ok());
    }

    #[test]
    fn lock_dir_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/locks");
        let provider = provider(&nested);
        let _guard = provider.acquire(&LockScope::named("x")).unwrap();
        assert!(nested.is_dir());
    }
}
