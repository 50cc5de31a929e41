//! Workspace change notifications and path filtering.
//!
//! This module provides:
//! - The workspace event vocabulary consumed by providers
//! - Glob-based exclusion filtering
//! - Gitignore-aware directory scanning
//! - An optional notify-rs adapter that turns filesystem changes into events

mod events;
mod filter;
mod scanner;
#[allow(clippy::module_inception)]
mod watcher;

pub use events::{EventBatch, WorkspaceEvent};
pub use filter::{ExclusionFilter, DEFAULT_EXCLUDES};
pub use scanner::{scan_directory, scan_directory_async, ScanOutcome, ScanStats};
pub use watcher::{FileWatcher, WatcherConfig};
