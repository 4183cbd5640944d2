use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::file::FileLockProvider;
use crate::in_process::InProcessLockProvider;
use crate::provider::{LockProvider, NoopLockProvider};
use crate::task::{DumpPolicy, TaskLock};

/// Which lock provider to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockProviderKind {
    /// No exclusion.
    #[default]
    None,
    InProcess,
    File,
}

/// Lock settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub provider: LockProviderKind,
    /// Directory for `file` lock files.
    pub lock_dir: PathBuf,
    /// How long to wait for a held scope before failing.
    pub timeout_ms: u64,
    /// How often the `file` provider retries a contended lock.
    pub poll_interval_ms: u64,
    pub dump_policy: DumpPolicy,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            provider: LockProviderKind::None,
            lock_dir: PathBuf::from(".stow/locks"),
            timeout_ms: 60_000,
            poll_interval_ms: 100,
            dump_policy: DumpPolicy::SkipIfExists,
        }
    }
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn build_provider(&self) -> Arc<dyn LockProvider> {
        match self.provider {
            LockProviderKind::None => Arc::new(NoopLockProvider),
            LockProviderKind::InProcess => Arc::new(InProcessLockProvider::new(self.timeout())),
            LockProviderKind::File => Arc::new(FileLockProvider::new(
                self.lock_dir.clone(),
                self.timeout(),
                self.poll_interval(),
            )),
        }
    }

    pub fn task_lock(&self) -> TaskLock {
        TaskLock::new(self.build_provider(), self.dump_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unlocked_skip_if_exists() {
        let config = LockConfig::default();
        assert_eq!(config.provider, LockProviderKind::None);
        let lock = config.task_lock();
        assert_eq!(lock.provider().name(), "none");
        assert_eq!(lock.policy(), DumpPolicy::SkipIfExists);
    }

    #[test]
    fn parses_partial_toml() {
        let config: LockConfig = toml::from_str(
            r#"
            provider = "file"
            lock_dir = "/tmp/stow-locks"
            dump_policy = "overwrite"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider, LockProviderKind::File);
        assert_eq!(config.lock_dir, PathBuf::from("/tmp/stow-locks"));
        assert_eq!(config.dump_policy, DumpPolicy::Overwrite);
        assert_eq!(config.timeout_ms, 60_000);
        assert_eq!(config.build_provider().name(), "file");
    }

    #[test]
    fn in_process_uses_timeout() {
        let config = LockConfig {
            provider: LockProviderKind::InProcess,
            timeout_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.build_provider().name(), "in_process");
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }
}
