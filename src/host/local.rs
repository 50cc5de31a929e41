//! Filesystem-backed host.
//!
//! Enumerates files with the gitignore-aware scanner, derives symbols from
//! the line-based outline extractor and keeps an in-process command registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::outline::{language_for, outline};
use super::{DocumentSymbol, Host, SymbolInformation};
use crate::error::HostError;
use crate::model::{file_uri, uri_to_path, ItemAction};
use crate::scheduler::yield_between_batches;
use crate::watcher::{scan_directory_async, ExclusionFilter};
use crate::Result;

/// Maximum symbols answered per workspace symbol query.
pub const WORKSPACE_SYMBOL_LIMIT: usize = 256;

/// How long a built symbol index answers queries before it is rebuilt.
const SYMBOL_CACHE_TTL: Duration = Duration::from_secs(2);

/// Files outlined between cooperative yields while building the symbol index.
const OUTLINE_BATCH_SIZE: usize = 25;

/// Commands registered by [`LocalHost::with_builtin_commands`].
pub const BUILTIN_COMMANDS: &[&str] = &[
    "quicksearch.search",
    "quicksearch.rebuildIndex",
    "quicksearch.clearHistory",
    "quicksearch.showStats",
    "workbench.action.files.save",
    "workbench.action.files.saveAll",
    "workbench.action.closeActiveEditor",
    "workbench.action.toggleSidebarVisibility",
    "editor.action.formatDocument",
    "editor.action.commentLine",
    "editor.action.rename",
    "git.commit",
    "git.pull",
    "git.push",
    "_quicksearch.resetState",
    "setContext",
    "workbench.internal.layoutChanged",
];

/// Handler invoked when a registered command executes.
pub type CommandHandler = Arc<dyn Fn(&[Value]) -> Result<()> + Send + Sync>;

struct SymbolCache {
    built_at: Instant,
    symbols: Arc<Vec<SymbolInformation>>,
}

/// Host over the local filesystem.
pub struct LocalHost {
    roots: RwLock<Vec<PathBuf>>,
    filter: RwLock<ExclusionFilter>,
    commands: RwLock<BTreeMap<String, CommandHandler>>,
    symbols: Mutex<Option<SymbolCache>>,
    performed: Mutex<Vec<ItemAction>>,
}

impl std::fmt::Debug for LocalHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalHost")
            .field("roots", &*self.roots.read())
            .field("commands", &self.commands.read().len())
            .finish_non_exhaustive()
    }
}

impl LocalHost {
    /// Create a host over `roots` with an empty command registry.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots: RwLock::new(roots),
            filter: RwLock::new(ExclusionFilter::default()),
            commands: RwLock::new(BTreeMap::new()),
            symbols: Mutex::new(None),
            performed: Mutex::new(Vec::new()),
        }
    }

    /// Register every id in [`BUILTIN_COMMANDS`] with a logging handler.
    #[must_use]
    pub fn with_builtin_commands(self) -> Self {
        for id in BUILTIN_COMMANDS {
            let name = (*id).to_string();
            self.register_command(id, move |args| {
                tracing::info!(command = %name, args = args.len(), "Command executed");
                Ok(())
            });
        }
        self
    }

    /// Register or replace a command handler.
    pub fn register_command<F>(&self, id: &str, handler: F)
    where
        F: Fn(&[Value]) -> Result<()> + Send + Sync + 'static,
    {
        self.commands
            .write()
            .insert(id.to_string(), Arc::new(handler));
    }

    /// Replace the workspace roots.
    pub fn set_workspace_roots(&self, roots: Vec<PathBuf>) {
        *self.roots.write() = roots;
        self.invalidate_symbols();
    }

    /// Patterns omitted when building the symbol index.
    pub fn set_exclusions(&self, patterns: &[String]) {
        *self.filter.write() = ExclusionFilter::new(patterns);
        self.invalidate_symbols();
    }

    /// Drop the cached symbol index so the next query rebuilds it.
    pub fn invalidate_symbols(&self) {
        self.symbols.lock().take();
    }

    /// Open and reveal actions performed so far, oldest first.
    #[must_use]
    pub fn performed_actions(&self) -> Vec<ItemAction> {
        self.performed.lock().clone()
    }

    async fn symbol_index(&self) -> Result<Arc<Vec<SymbolInformation>>> {
        if let Some(cache) = self.symbols.lock().as_ref() {
            if cache.built_at.elapsed() < SYMBOL_CACHE_TTL {
                return Ok(Arc::clone(&cache.symbols));
            }
        }

        let roots = self.workspace_roots();
        let filter = self.filter.read().clone();
        let mut symbols = Vec::new();
        let mut outlined = 0usize;

        for root in &roots {
            let files = scan_directory_async(root, &filter)
                .await
                .map_err(|e| HostError::SymbolQuery(e.to_string()))?
                .files;

            for path in files {
                let Some(language) = language_for(&path) else {
                    continue;
                };
                let content = match tokio::fs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                        continue;
                    }
                };
                let uri = file_uri(&path);
                flatten_symbols(&uri, &outline(&content, language), None, &mut symbols);

                outlined += 1;
                yield_between_batches(outlined, OUTLINE_BATCH_SIZE).await;
            }
        }

        tracing::debug!(files = outlined, symbols = symbols.len(), "Built symbol index");

        let symbols = Arc::new(symbols);
        *self.symbols.lock() = Some(SymbolCache {
            built_at: Instant::now(),
            symbols: Arc::clone(&symbols),
        });
        Ok(symbols)
    }
}

fn flatten_symbols(
    uri: &str,
    symbols: &[DocumentSymbol],
    container: Option<&str>,
    out: &mut Vec<SymbolInformation>,
) {
    for symbol in symbols {
        out.push(SymbolInformation {
            name: symbol.name.clone(),
            kind: symbol.kind,
            container_name: container.map(str::to_string),
            uri: uri.to_string(),
            range: symbol.range,
        });
        flatten_symbols(uri, &symbol.children, Some(&symbol.name), out);
    }
}

/// Case-insensitive in-order character match.
fn matches_query(name: &str, query: &str) -> bool {
    let mut name_chars = name.chars().flat_map(char::to_lowercase);
    query
        .chars()
        .flat_map(char::to_lowercase)
        .all(|q| name_chars.any(|c| c == q))
}

#[async_trait]
impl Host for LocalHost {
    fn workspace_roots(&self) -> Vec<PathBuf> {
        self.roots.read().clone()
    }

    async fn find_files(&self, root: &Path, filter: &ExclusionFilter) -> Result<Vec<PathBuf>> {
        Ok(scan_directory_async(root, filter).await?.files)
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| HostError::read(path.display().to_string(), e).into())
    }

    async fn workspace_symbols(&self, query: &str) -> Result<Vec<SymbolInformation>> {
        let index = self.symbol_index().await?;
        let query = query.trim();
        let match_all = query.is_empty() || query == "*";

        Ok(index
            .iter()
            .filter(|s| match_all || matches_query(&s.name, query))
            .take(WORKSPACE_SYMBOL_LIMIT)
            .cloned()
            .collect())
    }

    async fn document_symbols(&self, uri: &str) -> Result<Vec<DocumentSymbol>> {
        let path = uri_to_path(uri).ok_or_else(|| HostError::UnsupportedResource(uri.to_string()))?;
        let Some(language) = language_for(&path) else {
            return Ok(Vec::new());
        };
        let content = self.read_file(&path).await?;
        Ok(outline(&content, language))
    }

    async fn commands(&self) -> Result<Vec<String>> {
        Ok(self.commands.read().keys().cloned().collect())
    }

    async fn execute(&self, action: &ItemAction) -> Result<()> {
        match action {
            ItemAction::OpenFile { uri } | ItemAction::RevealRange { uri, .. } => {
                if uri_to_path(uri).is_none() {
                    return Err(HostError::UnsupportedResource(uri.clone()).into());
                }
                tracing::info!(uri = %uri, "Opening resource");
                self.performed.lock().push(action.clone());
                Ok(())
            }
            ItemAction::ExecuteCommand { command_id, args } => {
                let handler = self
                    .commands
                    .read()
                    .get(command_id)
                    .cloned()
                    .ok_or_else(|| HostError::UnknownCommand(command_id.clone()))?;
                handler(args)
            }
        }
    }
}
