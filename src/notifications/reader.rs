use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::ext::PathReportExt;
use crate::state::DirectorySet;

static NOTIFICATION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{8}\.txt$").unwrap());

#[derive(Debug, Clone)]
pub struct NotificationReader {
    notify_dir: PathBuf,
}

impl NotificationReader {
    pub fn new(notify_dir: impl Into<PathBuf>) -> Self {
        Self {
            notify_dir: notify_dir.into(),
        }
    }

    /// Nested reports are folded into their topmost reported ancestor.
    pub fn collect(&self) -> Result<DirectorySet, NotificationError> {
        let raw = self.drain()?;
        let notifications = deduplicate(raw);
        debug!("Collected {} notifications", notifications.len());
        Ok(notifications.into_iter().map(PathBuf::from).collect())
    }

    /// Raw records in file-name order. Every file is deleted once read.
    pub fn drain(&self) -> Result<Vec<String>, NotificationError> {
        let mut raw = Vec::new();

        for path in self.pending_files()? {
            let bytes = fs::read(&path).context(ReadSnafu { path: path.clone() })?;
            let before = raw.len();
            raw.extend(
                String::from_utf8_lossy(&bytes)
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
            debug!(
                "Read {} records from {}",
                raw.len() - before,
                path.report_display()
            );

            fs::remove_file(&path).context(RemoveSnafu { path: path.clone() })?;
        }

        Ok(raw)
    }

    fn pending_files(&self) -> Result<Vec<PathBuf>, NotificationError> {
        let entries = fs::read_dir(&self.notify_dir).context(ListSnafu {
            path: self.notify_dir.clone(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.context(ListSnafu {
                path: self.notify_dir.clone(),
            })?;
            if NOTIFICATION_NAME_RE.is_match(&entry.file_name().to_string_lossy()) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Shortest paths first: each accepted path discards itself and everything
/// under `accepted + "/"`.
pub fn deduplicate(mut remaining: Vec<String>) -> BTreeSet<String> {
    remaining.sort_by_key(String::len);

    let mut accepted = BTreeSet::new();
    while let Some(head) = remaining.first().cloned() {
        let prefix = format!("{head}/");
        remaining.retain(|path| *path != head && !path.starts_with(&prefix));
        accepted.insert(head);
    }
    accepted
}

#[derive(Debug, Snafu)]
pub enum NotificationError {
    #[snafu(display("Failed to list notification directory {}", path.report_display()))]
    ListError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read notification file {}", path.report_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove notification file {}", path.report_display()))]
    RemoveError {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_deduplicate_keeps_topmost_paths() {
        let result = deduplicate(strings(&["/a/b/c", "/a", "/d", "/a/b"]));
        assert_eq!(result, BTreeSet::from(["/a".to_string(), "/d".to_string()]));
    }

    #[test]
    fn test_deduplicate_is_idempotent() {
        let once = deduplicate(strings(&["/w/x/y", "/w/x", "/w/xy", "/v", "/v/1", "/w/x"]));
        let twice = deduplicate(once.iter().cloned().collect());
        assert_eq!(once, twice);
        assert_eq!(
            once,
            BTreeSet::from(["/v".to_string(), "/w/x".to_string(), "/w/xy".to_string()])
        );
    }

    #[test]
    fn test_deduplicate_does_not_treat_name_prefix_as_ancestor() {
        let result = deduplicate(strings(&["/data/tree", "/data/tree_0"]));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_deduplicate_empty() {
        assert!(deduplicate(Vec::new()).is_empty());
    }

    #[test]
    fn test_collect_consumes_matching_files_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let notify_dir = temp_dir.path();
        fs::write(notify_dir.join("notify_00000001.txt"), "/w/a\n/w/a/b\n\n").unwrap();
        fs::write(notify_dir.join("notify_00000002.txt"), "  /w/c  \n").unwrap();
        fs::write(notify_dir.join("notify_partial.tmp"), "/w/ignored\n").unwrap();
        let reader = NotificationReader::new(notify_dir);

        let first = reader.collect().expect("Failed to collect");
        let second = reader.collect().expect("Failed to collect");

        assert_eq!(
            first,
            DirectorySet::from([PathBuf::from("/w/a"), PathBuf::from("/w/c")])
        );
        assert!(second.is_empty());
        assert!(!notify_dir.join("notify_00000001.txt").exists());
        assert!(notify_dir.join("notify_partial.tmp").exists());
    }

    #[test]
    fn test_drain_keeps_raw_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("00000010.txt"), "/w/a\n/w/a/b\n").unwrap();
        let reader = NotificationReader::new(temp_dir.path());

        let raw = reader.drain().expect("Failed to drain");

        assert_eq!(raw, strings(&["/w/a", "/w/a/b"]));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let reader = NotificationReader::new("/this/path/does/not/exist");
        let result = reader.collect();
        assert!(matches!(result, Err(NotificationError::ListError { .. })));
    }

    #[compio::test]
    async fn test_collect_between_awaits_in_runtime() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let reader = NotificationReader::new(temp_dir.path());

        fs::write(temp_dir.path().join("00000001.txt"), "/w/a\n").unwrap();
        compio::time::sleep(std::time::Duration::from_millis(10)).await;
        let first = reader.collect().expect("Failed to collect");
        fs::write(temp_dir.path().join("00000002.txt"), "/w/b\n").unwrap();
        compio::time::sleep(std::time::Duration::from_millis(10)).await;
        let second = reader.collect().expect("Failed to collect");

        assert_eq!(first, DirectorySet::from([PathBuf::from("/w/a")]));
        assert_eq!(second, DirectorySet::from([PathBuf::from("/w/b")]));
    }
}
