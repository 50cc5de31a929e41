//! Reloads the settings file when it changes on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;

use super::Config;
use crate::error::WatcherError;
use crate::Result;

/// Quiet period before a rewritten settings file is read back.
pub const RELOAD_QUIET_PERIOD: Duration = Duration::from_millis(250);

fn watch_failed(path: &Path, reason: impl std::fmt::Display) -> crate::Error {
    WatcherError::WatchFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Watches one settings file and yields the reloaded configuration.
pub struct ConfigWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    changes: mpsc::Receiver<Config>,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Watch `path`.
    ///
    /// The parent directory is watched, so editors that replace the file
    /// instead of rewriting it are still noticed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be watched.
    pub fn new(path: &Path, quiet_period: Duration) -> Result<Self> {
        let path = path.canonicalize().map_err(|e| watch_failed(path, e))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| watch_failed(&path, "no parent directory"))?;

        let (tx, changes) = mpsc::channel(4);
        let target = path.clone();
        let mut debouncer = new_debouncer(quiet_period, move |result: DebounceEventResult| {
            match result {
                Ok(events) if events.iter().any(|e| e.path == target) => {
                    let config = Config::load(&target);
                    tracing::info!(path = %target.display(), "Configuration file changed");
                    if tx.blocking_send(config).is_err() {
                        tracing::debug!("Config receiver dropped");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config notification failed"),
            }
        })
        .map_err(|e| watch_failed(&path, e))?;

        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| watch_failed(&dir, e))?;
        tracing::debug!(path = %path.display(), "Watching configuration file");

        Ok(Self {
            _debouncer: debouncer,
            changes,
            path,
        })
    }

    /// Next reloaded configuration, or `None` once the watcher is gone.
    pub async fn recv(&mut self) -> Option<Config> {
        self.changes.recv().await
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_rejected() {
        let tmp = TempDir::new().unwrap();
        let result = ConfigWatcher::new(&tmp.path().join("absent.json"), RELOAD_QUIET_PERIOD);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rewrite_yields_reloaded_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("quicksearch.json");
        fs::write(&path, r#"{"maxResults": 10}"#).unwrap();
        fs::write(tmp.path().join("other.json"), "{}").unwrap();

        let mut watcher = ConfigWatcher::new(&path, Duration::from_millis(50)).unwrap();
        assert_eq!(watcher.path(), path.canonicalize().unwrap());

        fs::write(tmp.path().join("other.json"), r#"{"maxResults": 1}"#).unwrap();
        fs::write(&path, r#"{"maxResults": 25, "includeText": false}"#).unwrap();

        let config = tokio::time::timeout(Duration::from_secs(5), watcher.recv())
            .await
            .expect("reload within timeout")
            .expect("watcher alive");
        assert_eq!(config.max_results, 25);
        assert!(!config.include_text);
    }
}
