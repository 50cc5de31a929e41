//! Scripted in-memory host for unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DocumentSymbol, Host, SymbolInformation};
use crate::error::HostError;
use crate::model::{file_uri, ItemAction};
use crate::watcher::ExclusionFilter;
use crate::Result;

/// Host whose answers are set up by the test.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    pub roots: Mutex<Vec<PathBuf>>,
    /// File contents keyed by path.
    pub files: Mutex<BTreeMap<PathBuf, String>>,
    pub symbols: Mutex<Vec<SymbolInformation>>,
    pub outlines: Mutex<BTreeMap<String, Vec<DocumentSymbol>>>,
    pub commands: Mutex<Vec<String>>,
    pub executed: Mutex<Vec<ItemAction>>,
    pub symbol_queries: Mutex<Vec<String>>,
    pub find_calls: AtomicUsize,
    pub outline_calls: AtomicUsize,
    pub fail_files: AtomicBool,
    pub fail_symbols: AtomicBool,
    /// Fail bucket queries only, leaving the empty query working.
    pub fail_bucket_queries: AtomicBool,
    /// Documents whose reads and outlines fail.
    pub fail_uris: Mutex<BTreeSet<String>>,
    /// Outlines are captured, then delivered after this long.
    pub outline_delay: Mutex<Option<Duration>>,
}

impl ScriptedHost {
    /// Host with one root at `/ws`.
    pub fn new() -> Self {
        let host = Self::default();
        host.roots.lock().push(PathBuf::from("/ws"));
        host
    }

    pub fn add_file(&self, relative: &str, content: &str) -> String {
        let path = Path::new("/ws").join(relative);
        let uri = file_uri(&path);
        self.files.lock().insert(path, content.to_string());
        uri
    }

    pub fn remove_file(&self, relative: &str) {
        self.files.lock().remove(&Path::new("/ws").join(relative));
    }

    pub fn fail_uri(&self, uri: &str) {
        self.fail_uris.lock().insert(uri.to_string());
    }

    fn fails(&self, uri: &str) -> bool {
        self.fail_uris.lock().contains(uri)
    }
}

#[async_trait]
impl Host for ScriptedHost {
    fn workspace_roots(&self) -> Vec<PathBuf> {
        self.roots.lock().clone()
    }

    async fn find_files(&self, root: &Path, filter: &ExclusionFilter) -> Result<Vec<PathBuf>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_files.load(Ordering::SeqCst) {
            return Err(HostError::Enumeration {
                root: root.display().to_string(),
                reason: "permission denied".to_string(),
            }
            .into());
        }
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|p| p.starts_with(root) && !filter.should_exclude(p))
            .cloned()
            .collect())
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        if self.fails(&file_uri(path)) {
            return Err(HostError::read(path.display().to_string(), "permission denied").into());
        }
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| HostError::read(path.display().to_string(), "not found").into())
    }

    async fn workspace_symbols(&self, query: &str) -> Result<Vec<SymbolInformation>> {
        self.symbol_queries.lock().push(query.to_string());
        if self.fail_symbols.load(Ordering::SeqCst)
            || (!query.is_empty() && self.fail_bucket_queries.load(Ordering::SeqCst))
        {
            return Err(HostError::SymbolQuery("index unavailable".to_string()).into());
        }
        let query = query.to_lowercase();
        Ok(self
            .symbols
            .lock()
            .iter()
            .filter(|s| query.is_empty() || query == "*" || s.name.to_lowercase().starts_with(&query))
            .cloned()
            .collect())
    }

    async fn document_symbols(&self, uri: &str) -> Result<Vec<DocumentSymbol>> {
        self.outline_calls.fetch_add(1, Ordering::SeqCst);
        if self.fails(uri) {
            return Err(HostError::SymbolQuery(format!("no outline for {uri}")).into());
        }
        let outline = self.outlines.lock().get(uri).cloned().unwrap_or_default();
        let delay = *self.outline_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(outline)
    }

    async fn commands(&self) -> Result<Vec<String>> {
        Ok(self.commands.lock().clone())
    }

    async fn execute(&self, action: &ItemAction) -> Result<()> {
        if let ItemAction::ExecuteCommand { command_id, .. } = action {
            if !self.commands.lock().contains(command_id) {
                return Err(HostError::UnknownCommand(command_id.clone()).into());
            }
        }
        self.executed.lock().push(action.clone());
        Ok(())
    }
}
