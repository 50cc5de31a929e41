//! Glob-based exclusion filtering.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::WatcherError;
use crate::model::uri_to_path;
use crate::Result;

/// Patterns excluded from every index, before user patterns.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/target/**",
    "**/dist/**",
    "**/out/**",
    "**/build/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/venv/**",
    "**/.idea/**",
    "**/vendor/**",
    "**/coverage/**",
    "**/.DS_Store",
    "**/Thumbs.db",
    "**/*.min.js",
    "**/*.map",
    "**/*.lock",
    "**/*-lock.json",
];

/// Decides whether a filesystem path is omitted from indexing.
///
/// Matching is case-insensitive, `*` stops at separators while `**` crosses
/// them, and dotfiles are matched like any other name. A pattern without a
/// `/` matches the base name at any depth. Paths under a known workspace root
/// are matched relative to that root, and a relative pattern containing a
/// `/` only matches there.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    patterns: Vec<String>,
    /// Absolute and any-depth patterns.
    set: GlobSet,
    /// Patterns anchored at a workspace root.
    rooted: GlobSet,
    roots: Vec<PathBuf>,
}

/// Where a pattern applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Anywhere,
    Root,
}

impl ExclusionFilter {
    /// Create a filter from the defaults followed by `user_patterns`.
    ///
    /// Invalid user patterns are logged and skipped.
    #[must_use]
    pub fn new(user_patterns: &[String]) -> Self {
        let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|p| (*p).to_string()).collect();
        patterns.extend(user_patterns.iter().cloned());

        let mut anywhere = GlobSetBuilder::new();
        let mut rooted = GlobSetBuilder::new();
        let mut accepted = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match compile(&pattern) {
                Ok((glob, Anchor::Anywhere)) => {
                    anywhere.add(glob);
                    accepted.push(pattern);
                }
                Ok((glob, Anchor::Root)) => {
                    rooted.add(glob);
                    accepted.push(pattern);
                }
                Err(e) => tracing::warn!(error = %e, "Skipping exclusion pattern"),
            }
        }

        Self {
            patterns: accepted,
            set: build_set(&anywhere),
            rooted: build_set(&rooted),
            roots: Vec::new(),
        }
    }

    /// Match paths under `roots` relative to the root that contains them.
    #[must_use]
    pub fn with_roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        self.roots.extend(roots);
        // Longest root wins for nested workspace folders
        self.roots
            .sort_by_key(|r| std::cmp::Reverse(r.components().count()));
        self
    }

    /// Create a filter, failing on the first invalid user pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid glob.
    pub fn strict(user_patterns: &[String]) -> Result<Self> {
        for pattern in user_patterns {
            compile(pattern)?;
        }
        Ok(Self::new(user_patterns))
    }

    /// Ordered patterns: defaults first, then user patterns.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `path` matches any exclusion pattern.
    #[must_use]
    pub fn should_exclude(&self, path: &Path) -> bool {
        let relative = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok());
        let normalized = relative
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        self.set.is_match(normalized.as_str())
            || (relative.is_some() && self.rooted.is_match(normalized.as_str()))
    }

    /// Whether the resource behind `uri` is excluded.
    ///
    /// Only `file://` resources are inspected; other schemes are never excluded.
    #[must_use]
    pub fn should_exclude_uri(&self, uri: &str) -> bool {
        uri_to_path(uri).is_some_and(|path| self.should_exclude(&path))
    }
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn build_set(builder: &GlobSetBuilder) -> GlobSet {
    builder.build().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build exclusion set");
        GlobSet::empty()
    })
}

/// Normalize a pattern and decide where it applies.
fn anchored(pattern: &str) -> (String, Anchor) {
    let pattern = pattern.trim().replace('\\', "/");
    let pattern = pattern.strip_prefix("./").unwrap_or(&pattern);
    let pattern = match pattern.strip_suffix('/') {
        Some(dir) => format!("{dir}/**"),
        None => pattern.to_string(),
    };

    if pattern.starts_with('/') || pattern.starts_with("**") {
        (pattern, Anchor::Anywhere)
    } else if pattern.contains('/') {
        (pattern, Anchor::Root)
    } else {
        (format!("**/{pattern}"), Anchor::Anywhere)
    }
}

fn compile(pattern: &str) -> Result<(globset::Glob, Anchor)> {
    let (glob, anchor) = anchored(pattern);
    GlobBuilder::new(&glob)
        .case_insensitive(true)
        .literal_separator(true)
        .backslash_escape(false)
        .build()
        .map(|glob| (glob, anchor))
        .map_err(|e| {
            WatcherError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}
