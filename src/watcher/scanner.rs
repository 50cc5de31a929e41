//! Workspace file enumeration.
//!
//! Walks a root with the `ignore` crate, so `.gitignore`, `.ignore` and the
//! git exclude files apply on top of the exclusion filter.

use std::path::{Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};

use super::filter::ExclusionFilter;
use crate::error::HostError;
use crate::Result;

/// Counters for one walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Regular files seen, before exclusion.
    pub seen: u64,
    pub excluded: u64,
    /// Entries the walker could not read.
    pub errors: u64,
}

/// Files found under one root.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Files that survived filtering, in walk order.
    pub files: Vec<PathBuf>,
    pub stats: ScanStats,
}

fn enumeration_error(root: &Path, reason: impl std::fmt::Display) -> crate::Error {
    HostError::Enumeration {
        root: root.display().to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Whether the walker should descend into `entry`.
fn descend(filter: &ExclusionFilter, entry: &DirEntry) -> bool {
    let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
    // Probe a child so `dir/**` patterns prune the directory itself
    !(is_dir && entry.depth() > 0 && filter.should_exclude(&entry.path().join("_")))
}

/// Every file under `root` that `filter` and the ignore files let through.
///
/// Dotfiles are walked; hiding them is up to the exclusion patterns.
///
/// # Errors
///
/// Returns [`HostError::Enumeration`] if `root` is not a directory.
pub fn scan_directory(root: &Path, filter: &ExclusionFilter) -> Result<ScanOutcome> {
    if !root.is_dir() {
        return Err(enumeration_error(root, "not a directory"));
    }

    let filter = filter.clone().with_roots([root.to_path_buf()]);
    let mut stats = ScanStats::default();
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .parents(true)
        .filter_entry({
            let filter = filter.clone();
            move |entry| descend(&filter, entry)
        })
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                stats.errors += 1;
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        stats.seen += 1;

        let path = entry.into_path();
        if filter.should_exclude(&path) {
            stats.excluded += 1;
        } else {
            files.push(path);
        }
    }

    tracing::debug!(
        root = %root.display(),
        files = files.len(),
        excluded = stats.excluded,
        errors = stats.errors,
        "Workspace root scanned"
    );
    Ok(ScanOutcome { files, stats })
}

/// [`scan_directory`] on the blocking pool.
///
/// # Errors
///
/// Returns an error if the scan fails or its task panics.
pub async fn scan_directory_async(root: &Path, filter: &ExclusionFilter) -> Result<ScanOutcome> {
    let owned_root = root.to_path_buf();
    let filter = filter.clone();

    tokio::task::spawn_blocking(move || scan_directory(&owned_root, &filter))
        .await
        .map_err(|e| enumeration_error(root, e))?
}
