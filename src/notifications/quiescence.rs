use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::ext::PathReportExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleConfig {
    /// Time granted to the watcher before the notification directory is
    /// inspected at all.
    pub min_wait: Duration,
    pub quiet_period: Duration,
    pub poll_interval: Duration,
    /// Upper bound on the whole wait; verification proceeds afterwards.
    pub max_wait: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            min_wait: Duration::from_millis(500),
            quiet_period: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(30),
        }
    }
}

pub trait Quiescence {
    async fn settle(&self) -> Result<(), QuiescenceError>;
}

#[derive(Debug, Clone)]
pub struct DebounceBarrier {
    notify_dir: PathBuf,
    config: SettleConfig,
}

type Snapshot = Vec<(String, u64, Option<SystemTime>)>;

impl DebounceBarrier {
    pub fn new(notify_dir: impl Into<PathBuf>, config: SettleConfig) -> Self {
        Self {
            notify_dir: notify_dir.into(),
            config,
        }
    }

    fn snapshot(&self) -> Result<Snapshot, QuiescenceError> {
        let entries = fs::read_dir(&self.notify_dir).context(ListSnafu {
            path: self.notify_dir.clone(),
        })?;

        let mut snapshot = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                // Entries can vanish between listing and stat.
                let metadata = entry.metadata().ok()?;
                Some((
                    entry.file_name().to_string_lossy().into_owned(),
                    metadata.len(),
                    metadata.modified().ok(),
                ))
            })
            .collect::<Snapshot>();
        snapshot.sort();
        Ok(snapshot)
    }
}

impl Quiescence for DebounceBarrier {
    async fn settle(&self) -> Result<(), QuiescenceError> {
        let started = Instant::now();
        compio::time::sleep(self.config.min_wait).await;

        let mut last = self.snapshot()?;
        let mut quiet_since = Instant::now();
        loop {
            if quiet_since.elapsed() >= self.config.quiet_period {
                debug!(
                    "Notification directory settled after {:?} with {} entries",
                    started.elapsed(),
                    last.len()
                );
                return Ok(());
            }
            if started.elapsed() >= self.config.max_wait {
                warn!(
                    "Notification directory still changing after {:?}, verifying anyway",
                    self.config.max_wait
                );
                return Ok(());
            }

            compio::time::sleep(self.config.poll_interval).await;
            let current = self.snapshot()?;
            if current != last {
                last = current;
                quiet_since = Instant::now();
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum QuiescenceError {
    #[snafu(display("Failed to inspect notification directory {}", path.report_display()))]
    ListError {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quick_config() -> SettleConfig {
        SettleConfig {
            min_wait: Duration::from_millis(10),
            quiet_period: Duration::from_millis(50),
            poll_interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(5),
        }
    }

    #[compio::test]
    async fn test_quiet_directory_settles_after_quiet_period() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("00000001.txt"), "/w/a\n").unwrap();
        let barrier = DebounceBarrier::new(temp_dir.path(), quick_config());

        let started = Instant::now();
        barrier.settle().await.expect("Failed to settle");

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(60));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[compio::test]
    async fn test_max_wait_bounds_the_barrier() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = SettleConfig {
            quiet_period: Duration::from_secs(60),
            max_wait: Duration::from_millis(100),
            ..quick_config()
        };
        let barrier = DebounceBarrier::new(temp_dir.path(), config);

        let started = Instant::now();
        barrier.settle().await.expect("Failed to settle");

        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_snapshot_sees_new_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let barrier = DebounceBarrier::new(temp_dir.path(), quick_config());

        let before = barrier.snapshot().unwrap();
        fs::write(temp_dir.path().join("00000001.txt"), "/w/a\n").unwrap();
        let after = barrier.snapshot().unwrap();

        assert!(before.is_empty());
        assert_eq!(after.len(), 1);
        assert_ne!(before, after);
    }

    #[compio::test]
    async fn test_missing_directory_is_an_error() {
        let barrier = DebounceBarrier::new("/this/path/does/not/exist", quick_config());
        let result = barrier.settle().await;
        assert!(matches!(result, Err(QuiescenceError::ListError { .. })));
    }
}
