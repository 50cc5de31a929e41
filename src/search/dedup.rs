//! Deduplication of items reported by overlapping sources.

use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{ItemKind, SearchItem};

/// Label with a trailing empty parameter list removed.
#[must_use]
pub fn normalize_label(label: &str) -> &str {
    label.trim_end().strip_suffix("()").unwrap_or(label).trim_end()
}

/// Canonical identity of the entity an item describes.
///
/// Structurally distinct items describing the same file, command or symbol
/// position share a key.
#[must_use]
pub fn dedup_key(item: &SearchItem) -> String {
    match &item.kind {
        ItemKind::Symbol(loc) | ItemKind::Class(loc) => format!(
            "{}:{}:{}:{}:{}",
            item.item_type(),
            normalize_label(&item.label),
            loc.uri,
            loc.range.start.line,
            loc.range.start.column
        ),
        ItemKind::File { uri, .. } => format!("file:{uri}"),
        ItemKind::Command { command_id, .. } => format!("command:{command_id}"),
        ItemKind::TextMatch { .. } => {
            let remainder = item.id.split_once(':').map_or(item.id.as_str(), |(_, rest)| rest);
            format!(
                "{}:{}:{remainder}",
                item.item_type(),
                normalize_label(&item.label)
            )
        }
    }
}

/// Insertion-ordered set of items keyed by [`dedup_key`]. The first item seen
/// for a key wins.
#[derive(Debug, Default)]
pub struct DedupIndex {
    keys: HashSet<String>,
    items: Vec<Arc<SearchItem>>,
}

impl DedupIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: HashSet::with_capacity(capacity),
            items: Vec::with_capacity(capacity),
        }
    }

    /// Add `item` unless an item with the same key is present.
    pub fn insert(&mut self, item: Arc<SearchItem>) -> bool {
        let inserted = self.keys.insert(dedup_key(&item));
        if inserted {
            self.items.push(item);
        }
        inserted
    }

    /// Insert every item, returning how many were duplicates.
    pub fn extend<'a>(&mut self, items: impl IntoIterator<Item = &'a Arc<SearchItem>>) -> usize {
        items
            .into_iter()
            .filter(|item| !self.insert(Arc::clone(item)))
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn into_items(self) -> Vec<Arc<SearchItem>> {
        self.items
    }
}
