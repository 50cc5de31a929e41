//! Document symbol provider: per-file symbol trees for common source files.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;

use super::symbols::{display_path, document_symbol_items};
use super::{Patch, ProviderKind, ProviderState};
use crate::error::ProviderError;
use crate::host::Host;
use crate::model::{file_uri, uri_to_path, SearchItem};
use crate::watcher::{ExclusionFilter, WorkspaceEvent};
use crate::Result;

/// Most files outlined per refresh.
pub const MAX_DOCUMENT_FILES: usize = 300;

/// Documents requested concurrently before yielding.
pub const DOCUMENT_BATCH_SIZE: usize = 10;

/// Extensions whose documents are outlined.
const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "py", "java", "cs", "go", "rs", "cpp", "c", "h", "hpp", "rb", "php",
    "swift", "kt",
];

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Outlines individual documents.
pub struct DocumentSymbolProvider {
    host: Arc<dyn Host>,
    filter: ExclusionFilter,
    state: ProviderState,
    /// Documents saved since the timer last fired.
    saved: Mutex<BTreeSet<String>>,
    refresh_pending: AtomicBool,
}

impl fmt::Debug for DocumentSymbolProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentSymbolProvider")
            .field("state", &self.state)
            .field("saved", &self.saved.lock().len())
            .finish_non_exhaustive()
    }
}

impl DocumentSymbolProvider {
    #[must_use]
    pub fn new(host: Arc<dyn Host>, filter: ExclusionFilter, window: Duration) -> Self {
        Self {
            host,
            filter,
            state: ProviderState::new(ProviderKind::DocumentSymbols, window),
            saved: Mutex::new(BTreeSet::new()),
            refresh_pending: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ProviderState {
        &self.state
    }

    pub async fn refresh(&self, force: bool) {
        self.state.refresh_with(force, || self.enumerate()).await;
    }

    fn filter_for(&self, roots: &[PathBuf]) -> ExclusionFilter {
        self.filter.clone().with_roots(roots.iter().cloned())
    }

    async fn source_files(&self, roots: &[PathBuf], filter: &ExclusionFilter) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut failures = 0usize;

        for root in roots {
            match self.host.find_files(root, filter).await {
                Ok(found) => files.extend(
                    found
                        .into_iter()
                        .filter(|p| is_source_file(p) && !filter.should_exclude(p)),
                ),
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "Skipping workspace root");
                    failures += 1;
                }
            }
            if files.len() >= MAX_DOCUMENT_FILES {
                break;
            }
        }

        if failures > 0 && failures == roots.len() {
            return Err(ProviderError::Enumeration {
                provider: ProviderKind::DocumentSymbols.as_str(),
                reason: "no workspace root could be enumerated".to_string(),
            }
            .into());
        }
        files.truncate(MAX_DOCUMENT_FILES);
        Ok(files)
    }

    async fn outline(&self, uri: &str, relative: &str) -> Result<Vec<SearchItem>> {
        let symbols = self.host.document_symbols(uri).await?;
        Ok(document_symbol_items(uri, relative, &symbols))
    }

    async fn enumerate(&self) -> Result<Vec<Arc<SearchItem>>> {
        let roots = self.host.workspace_roots();
        let filter = self.filter_for(&roots);
        let files = self.source_files(&roots, &filter).await?;
        let mut items = Vec::new();

        for batch in files.chunks(DOCUMENT_BATCH_SIZE) {
            let uris: Vec<String> = batch.iter().map(|p| file_uri(p)).collect();
            let relatives: Vec<String> = uris.iter().map(|uri| display_path(&roots, uri)).collect();
            let outlines = join_all(
                uris.iter()
                    .zip(&relatives)
                    .map(|(uri, relative)| self.outline(uri, relative)),
            )
            .await;

            for (uri, outline) in uris.iter().zip(outlines) {
                match outline {
                    Ok(found) => items.extend(found.into_iter().map(Arc::new)),
                    Err(e) => tracing::debug!(uri = %uri, error = %e, "Skipping document"),
                }
            }
            tokio::task::yield_now().await;
        }

        tracing::debug!(files = files.len(), symbols = items.len(), "Outlined documents");
        Ok(items)
    }

    /// Replace the cached symbols of one document.
    ///
    /// Unsupported or excluded documents only lose their cached symbols; a
    /// failed lookup keeps them.
    pub async fn update_document(&self, uri: &str) {
        self.state
            .patch_with(|| async move {
                let roots = self.host.workspace_roots();
                let filter = self.filter_for(&roots);
                let supported = uri_to_path(uri)
                    .is_some_and(|p| is_source_file(&p) && !filter.should_exclude(&p));

                let fresh: Vec<Arc<SearchItem>> = if supported {
                    match self.outline(uri, &display_path(&roots, uri)).await {
                        Ok(found) => found.into_iter().map(Arc::new).collect(),
                        Err(e) => {
                            tracing::debug!(uri = %uri, error = %e, "Keeping cached symbols");
                            return None;
                        }
                    }
                } else {
                    Vec::new()
                };
                tracing::debug!(uri = %uri, symbols = fresh.len(), "Document symbols updated");

                let uri = uri.to_string();
                let patch: Patch = Arc::new(move |items: &mut Vec<Arc<SearchItem>>| {
                    items.retain(|item| item.uri() != Some(uri.as_str()));
                    items.extend(fresh.iter().cloned());
                });
                Some(patch)
            })
            .await;
    }

    /// Drop every cached symbol of one document.
    pub fn remove_document(&self, uri: &str) {
        let uri = uri.to_string();
        self.state.patch(Arc::new(move |items: &mut Vec<Arc<SearchItem>>| {
            items.retain(|item| item.uri() != Some(uri.as_str()));
        }));
    }

    /// Saved documents are re-outlined in place; other file-set changes
    /// schedule a full refresh. Both wait for the provider's timer.
    pub fn handle_event(this: &Arc<Self>, event: &WorkspaceEvent) {
        match event {
            WorkspaceEvent::DocumentSaved(uri) => {
                this.saved.lock().insert(uri.clone());
                Self::schedule(this);
            }
            WorkspaceEvent::FileDeleted(uri) => {
                this.saved.lock().remove(uri);
                this.remove_document(uri);
            }
            WorkspaceEvent::FileRenamed { from, .. } => {
                this.remove_document(from);
                this.refresh_pending.store(true, Ordering::SeqCst);
                Self::schedule(this);
            }
            WorkspaceEvent::FileCreated(_) | WorkspaceEvent::WorkspaceFoldersChanged(_) => {
                this.refresh_pending.store(true, Ordering::SeqCst);
                Self::schedule(this);
            }
            _ => {}
        }
    }

    fn schedule(this: &Arc<Self>) {
        let provider = Arc::clone(this);
        this.state.debouncer().schedule(async move {
            provider.flush().await;
        });
    }

    /// Run the work queued since the timer last fired.
    async fn flush(&self) {
        if self.refresh_pending.swap(false, Ordering::SeqCst) {
            self.refresh(false).await;
        }
        let saved = std::mem::take(&mut *self.saved.lock());
        let saved: Vec<String> = saved.into_iter().collect();
        for batch in saved.chunks(DOCUMENT_BATCH_SIZE) {
            join_all(batch.iter().map(|uri| self.update_document(uri))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::ScriptedHost;
    use crate::host::DocumentSymbol;
    use crate::model::{Range, SymbolKind};
    use crate::providers::Provider;

    fn class(name: &str, line: u32) -> DocumentSymbol {
        DocumentSymbol {
            name: name.to_string(),
            detail: None,
            kind: SymbolKind::Class,
            range: Range::on_line(line, 6, u32::try_from(name.len()).unwrap()),
            children: Vec::new(),
        }
    }

    fn provider(host: &Arc<ScriptedHost>) -> Arc<DocumentSymbolProvider> {
        Arc::new(DocumentSymbolProvider::new(
            Arc::clone(host) as Arc<dyn Host>,
            ExclusionFilter::default(),
            Duration::from_millis(10),
        ))
    }

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("/ws/a.ts")));
        assert!(is_source_file(Path::new("/ws/A.PY")));
        assert!(!is_source_file(Path::new("/ws/README.md")));
    }

    #[tokio::test]
    async fn test_outlines_source_files_only() {
        let host = Arc::new(ScriptedHost::new());
        let foo = host.add_file("Foo.ts", "class Foo {}");
        let readme = host.add_file("README.md", "# Foo");
        host.outlines.lock().insert(foo, vec![class("Foo", 0)]);
        host.outlines.lock().insert(readme, vec![class("NotASource", 0)]);

        let items = Provider::DocumentSymbols(provider(&host)).get_items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "Foo");
        assert_eq!(items[0].detail.as_deref(), Some("Foo.ts"));
    }

    #[tokio::test]
    async fn test_file_cap() {
        let host = Arc::new(ScriptedHost::new());
        for i in 0..MAX_DOCUMENT_FILES + 20 {
            let uri = host.add_file(&format!("src/m{i:04}.ts"), "");
            host.outlines.lock().insert(uri, vec![class(&format!("M{i}"), 0)]);
        }

        let items = Provider::DocumentSymbols(provider(&host)).get_items().await;
        assert_eq!(items.len(), MAX_DOCUMENT_FILES);
    }

    #[tokio::test]
    async fn test_save_replaces_only_that_document() {
        let host = Arc::new(ScriptedHost::new());
        let a = host.add_file("a.ts", "");
        let b = host.add_file("b.ts", "");
        host.outlines.lock().insert(a.clone(), vec![class("Alpha", 0)]);
        host.outlines.lock().insert(b.clone(), vec![class("Beta", 0)]);

        let inner = provider(&host);
        let docs = Provider::DocumentSymbols(Arc::clone(&inner));
        assert_eq!(docs.get_items().await.len(), 2);

        host.outlines
            .lock()
            .insert(a.clone(), vec![class("Alpha", 0), class("AlphaTwo", 5)]);
        host.outlines.lock().insert(b, vec![class("Changed", 0)]);
        inner.update_document(&a).await;

        let mut labels: Vec<String> = docs.snapshot().iter().map(|i| i.label.clone()).collect();
        labels.sort();
        assert_eq!(labels, vec!["Alpha", "AlphaTwo", "Beta"]);
        assert_eq!(host.find_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_event_removes_document() {
        let host = Arc::new(ScriptedHost::new());
        let a = host.add_file("a.ts", "");
        let b = host.add_file("b.ts", "");
        host.outlines.lock().insert(a.clone(), vec![class("Alpha", 0)]);
        host.outlines.lock().insert(b, vec![class("Beta", 0)]);

        let docs = Provider::DocumentSymbols(provider(&host));
        docs.get_items().await;
        docs.handle_event(&WorkspaceEvent::FileDeleted(a));

        let snapshot = docs.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].label, "Beta");
    }

    #[tokio::test]
    async fn test_failed_outline_skips_only_that_document() {
        let host = Arc::new(ScriptedHost::new());
        let a = host.add_file("a.ts", "");
        let b = host.add_file("b.ts", "");
        let c = host.add_file("c.ts", "");
        host.outlines.lock().insert(a, vec![class("Alpha", 0)]);
        host.outlines.lock().insert(b.clone(), vec![class("Beta", 0)]);
        host.outlines.lock().insert(c, vec![class("Gamma", 0)]);
        host.fail_uri(&b);

        let docs = Provider::DocumentSymbols(provider(&host));
        let mut labels: Vec<String> = docs
            .get_items()
            .await
            .iter()
            .map(|i| i.label.clone())
            .collect();
        labels.sort();
        assert_eq!(labels, vec!["Alpha", "Gamma"]);
        assert!(docs.last_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_burst_outlines_once() {
        let host = Arc::new(ScriptedHost::new());
        let a = host.add_file("a.ts", "");
        host.outlines.lock().insert(a.clone(), vec![class("Alpha", 0)]);

        let docs = Provider::DocumentSymbols(provider(&host));
        docs.get_items().await;
        assert_eq!(host.outline_calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        host.outlines
            .lock()
            .insert(a.clone(), vec![class("Alpha", 0), class("AlphaTwo", 4)]);
        for _ in 0..5 {
            docs.handle_event(&WorkspaceEvent::DocumentSaved(a.clone()));
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(docs.snapshot().len(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(docs.snapshot().len(), 2);
        assert_eq!(host.outline_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
