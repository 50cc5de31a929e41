//! Workspace change events and batching.

#![allow(clippy::missing_const_for_fn)]

use std::path::PathBuf;

use crate::config::Config;

/// Change notification consumed by providers and the ranking engine.
///
/// Resources are identified by URI.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceEvent {
    /// File was created.
    FileCreated(String),
    /// File was deleted.
    FileDeleted(String),
    /// File was renamed from old URI to new URI.
    FileRenamed { from: String, to: String },
    /// Document content was saved.
    DocumentSaved(String),
    /// Document was closed in the editor.
    DocumentClosed(String),
    /// The active editor switched to another document.
    ActiveEditorChanged(String),
    /// Workspace roots were added or removed.
    WorkspaceFoldersChanged(Vec<PathBuf>),
    /// Configuration was reloaded.
    ConfigurationChanged(Box<Config>),
}

impl WorkspaceEvent {
    /// Get the primary resource associated with this event.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::FileCreated(u)
            | Self::FileDeleted(u)
            | Self::DocumentSaved(u)
            | Self::DocumentClosed(u)
            | Self::ActiveEditorChanged(u) => Some(u),
            Self::FileRenamed { to, .. } => Some(to),
            Self::WorkspaceFoldersChanged(_) | Self::ConfigurationChanged(_) => None,
        }
    }

    /// Whether the event changes the set of files in the workspace.
    #[must_use]
    pub fn changes_file_set(&self) -> bool {
        matches!(
            self,
            Self::FileCreated(_)
                | Self::FileDeleted(_)
                | Self::FileRenamed { .. }
                | Self::WorkspaceFoldersChanged(_)
        )
    }
}

/// Batch of file events collected during one quiet period.
#[derive(Debug, Default)]
pub struct EventBatch {
    /// Created files.
    pub created: Vec<String>,
    /// Saved files.
    pub saved: Vec<String>,
    /// Deleted files.
    pub deleted: Vec<String>,
}

impl EventBatch {
    /// Create a new empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event to the batch.
    ///
    /// Only file-level events are batched; anything else is ignored.
    pub fn add(&mut self, event: WorkspaceEvent) {
        match event {
            WorkspaceEvent::FileCreated(uri) => {
                self.deleted.retain(|u| u != &uri);
                push_unique(&mut self.created, uri);
            }
            WorkspaceEvent::DocumentSaved(uri) => {
                if !self.created.contains(&uri) {
                    push_unique(&mut self.saved, uri);
                }
            }
            WorkspaceEvent::FileDeleted(uri) => {
                self.created.retain(|u| u != &uri);
                self.saved.retain(|u| u != &uri);
                push_unique(&mut self.deleted, uri);
            }
            WorkspaceEvent::FileRenamed { from, to } => {
                // Treat as delete + create
                self.add(WorkspaceEvent::FileDeleted(from));
                self.add(WorkspaceEvent::FileCreated(to));
            }
            _ => {}
        }
    }

    /// Check if batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.saved.is_empty() && self.deleted.is_empty()
    }

    /// Get total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.created.len() + self.saved.len() + self.deleted.len()
    }

    /// Clear all events.
    pub fn clear(&mut self) {
        self.created.clear();
        self.saved.clear();
        self.deleted.clear();
    }

    /// Expand the batch back into events, deletions first.
    #[must_use]
    pub fn into_events(self) -> Vec<WorkspaceEvent> {
        let mut events = Vec::with_capacity(self.len());
        events.extend(self.deleted.into_iter().map(WorkspaceEvent::FileDeleted));
        events.extend(self.created.into_iter().map(WorkspaceEvent::FileCreated));
        events.extend(self.saved.into_iter().map(WorkspaceEvent::DocumentSaved));
        events
    }
}

fn push_unique(list: &mut Vec<String>, uri: String) {
    if !list.contains(&uri) {
        list.push(uri);
    }
}
