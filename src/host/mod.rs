//! Host environment capabilities.
//!
//! The search core never touches the editor or filesystem directly. Everything
//! it needs (workspace roots, file enumeration, symbol queries, the command
//! registry and action execution) goes through the [`Host`] trait. A
//! filesystem-backed implementation is provided by [`LocalHost`].

mod local;
mod outline;
#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ItemAction, Range, SymbolKind};
use crate::watcher::ExclusionFilter;
use crate::Result;

pub use local::{CommandHandler, LocalHost, BUILTIN_COMMANDS, WORKSPACE_SYMBOL_LIMIT};
pub use outline::{is_outline_supported, language_for, outline, Language};

/// A workspace-wide symbol match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInformation {
    pub name: String,
    pub kind: SymbolKind,
    pub container_name: Option<String>,
    pub uri: String,
    pub range: Range,
}

/// A node in a single document's symbol tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSymbol {
    pub name: String,
    pub detail: Option<String>,
    pub kind: SymbolKind,
    pub range: Range,
    #[serde(default)]
    pub children: Vec<Self>,
}

/// Capabilities the search core requires from its environment.
#[async_trait]
pub trait Host: Send + Sync {
    /// Current workspace roots.
    fn workspace_roots(&self) -> Vec<PathBuf>;

    /// List files under `root`, omitting anything `filter` excludes.
    async fn find_files(&self, root: &Path, filter: &ExclusionFilter) -> Result<Vec<PathBuf>>;

    /// Read a resource's text content.
    async fn read_file(&self, path: &Path) -> Result<String>;

    /// Query the workspace symbol index.
    async fn workspace_symbols(&self, query: &str) -> Result<Vec<SymbolInformation>>;

    /// Symbol tree of a single document.
    async fn document_symbols(&self, uri: &str) -> Result<Vec<DocumentSymbol>>;

    /// Every registered command identifier.
    async fn commands(&self) -> Result<Vec<String>>;

    /// Perform a selected item's action.
    async fn execute(&self, action: &ItemAction) -> Result<()>;
}

/// Path of `path` relative to the workspace root that contains it.
///
/// Falls back to the full path when no root contains it.
#[must_use]
pub fn workspace_relative(roots: &[PathBuf], path: &Path) -> String {
    roots
        .iter()
        .filter_map(|root| path.strip_prefix(root).ok())
        .min_by_key(|rel| rel.components().count())
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
