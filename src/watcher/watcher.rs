//! Filesystem notifications as workspace events.
//!
//! Hosts without an editor event stream of their own (the CLI) use this to
//! learn about created, saved and deleted files under the workspace roots.

#![allow(clippy::used_underscore_binding)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::events::{EventBatch, WorkspaceEvent};
use super::filter::ExclusionFilter;
use crate::error::WatcherError;
use crate::model::file_uri;
use crate::Result;

/// Quiet period before a burst of notifications is delivered.
const NOTIFY_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Batches buffered before the notify thread blocks.
const BATCH_BUFFER: usize = 64;

/// Watcher setup.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Workspace roots, watched recursively.
    pub roots: Vec<PathBuf>,
    pub quiet_period: Duration,
    /// Files that already exist, so their first notification counts as a save.
    pub known_paths: Vec<PathBuf>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            quiet_period: NOTIFY_QUIET_PERIOD,
            known_paths: Vec::new(),
        }
    }
}

/// Turns "something happened at this path" into a typed event.
#[derive(Debug, Default)]
struct PathTracker {
    known: HashSet<PathBuf>,
}

impl PathTracker {
    fn classify(&mut self, path: PathBuf, exists: bool) -> WorkspaceEvent {
        let uri = file_uri(&path);
        if !exists {
            self.known.remove(&path);
            WorkspaceEvent::FileDeleted(uri)
        } else if self.known.insert(path) {
            WorkspaceEvent::FileCreated(uri)
        } else {
            WorkspaceEvent::DocumentSaved(uri)
        }
    }
}

struct Classifier {
    roots: Arc<Mutex<Vec<PathBuf>>>,
    tracker: PathTracker,
    filter: ExclusionFilter,
}

impl Classifier {
    fn batch(&mut self, result: DebounceEventResult) -> EventBatch {
        let mut batch = EventBatch::new();
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(error = %e, "Filesystem notification failed");
                return batch;
            }
        };

        let roots = self.roots.lock().clone();
        let filter = self.filter.clone().with_roots(roots.iter().cloned());
        for event in events {
            if !matches!(event.kind, DebouncedEventKind::Any) {
                continue;
            }
            let path = event.path;
            if path.is_dir() || !under_any_root(&roots, &path) || filter.should_exclude(&path) {
                continue;
            }
            let exists = path.exists();
            batch.add(self.tracker.classify(path, exists));
        }
        batch
    }
}

/// Recursive watcher over the workspace roots.
pub struct FileWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    events: mpsc::Receiver<EventBatch>,
    roots: Arc<Mutex<Vec<PathBuf>>>,
}

impl FileWatcher {
    /// Start watching `config.roots`.
    ///
    /// Directories and paths matched by `filter` never produce events.
    /// Patterns are anchored at whichever roots are watched at the time.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created or a root
    /// cannot be watched.
    pub fn new(config: &WatcherConfig, filter: ExclusionFilter) -> Result<Self> {
        let (tx, events) = mpsc::channel(BATCH_BUFFER);
        let roots = Arc::new(Mutex::new(Vec::new()));
        let mut classifier = Classifier {
            roots: Arc::clone(&roots),
            tracker: PathTracker {
                known: config.known_paths.iter().cloned().collect(),
            },
            filter,
        };

        let debouncer = new_debouncer(config.quiet_period, move |result: DebounceEventResult| {
            let batch = classifier.batch(result);
            if !batch.is_empty() && tx.blocking_send(batch).is_err() {
                tracing::debug!("Watcher receiver dropped");
            }
        })
        .map_err(|e| WatcherError::WatchFailed {
            path: "<init>".to_string(),
            reason: e.to_string(),
        })?;

        let mut watcher = Self {
            _debouncer: debouncer,
            events,
            roots,
        };
        watcher.set_roots(&config.roots)?;
        Ok(watcher)
    }

    /// Reconcile the watched set with `roots`: new roots are watched,
    /// vanished ones released.
    ///
    /// # Errors
    ///
    /// Returns an error if a new root is missing or cannot be watched. Roots
    /// reconciled before the failure stay applied.
    pub fn set_roots(&mut self, roots: &[PathBuf]) -> Result<()> {
        let current = self.roots();

        for root in current.iter().filter(|r| !roots.contains(r)) {
            if let Err(e) = self._debouncer.watcher().unwatch(root) {
                tracing::warn!(root = %root.display(), error = %e, "Failed to release root");
            }
            self.roots.lock().retain(|r| r != root);
            tracing::info!(root = %root.display(), "Stopped watching root");
        }

        for root in roots.iter().filter(|r| !current.contains(r)) {
            if !root.is_dir() {
                return Err(watch_failed(root, "not a directory"));
            }
            self._debouncer
                .watcher()
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| watch_failed(root, e))?;
            self.roots.lock().push(root.clone());
            tracing::info!(root = %root.display(), "Watching root");
        }
        Ok(())
    }

    /// Next batch of events, or `None` once the watcher is gone.
    pub async fn recv(&mut self) -> Option<EventBatch> {
        self.events.recv().await
    }

    #[must_use]
    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.lock().clone()
    }
}

fn watch_failed(root: &Path, reason: impl std::fmt::Display) -> crate::Error {
    WatcherError::WatchFailed {
        path: root.display().to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn under_any_root(roots: &[PathBuf], path: &Path) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}
