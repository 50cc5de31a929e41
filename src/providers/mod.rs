//! Source providers.
//!
//! Each provider owns one slice of the corpus, keeps the latest snapshot of
//! its items and knows how to re-enumerate it. Providers react to workspace
//! events through their own debounced refresh timer.

mod command;
mod document_symbols;
mod file;
mod symbols;
mod workspace_symbols;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::Instrument;

use crate::config::Config;
use crate::model::SearchItem;
use crate::scheduler::Debouncer;
use crate::telemetry::{spans, INDEXED_ITEMS, REFRESH_TOTAL};
use crate::watcher::WorkspaceEvent;
use crate::Result;

pub use command::{command_label, is_internal_command, CommandProvider};
pub use document_symbols::{DocumentSymbolProvider, DOCUMENT_BATCH_SIZE, MAX_DOCUMENT_FILES};
pub use file::{icon_for, FileProvider};
pub use symbols::{document_symbol_items, symbol_item};
pub use workspace_symbols::{WorkspaceSymbolProvider, SYMBOL_QUERY_BUCKETS};

/// Immutable list of items, swapped wholesale on refresh.
pub type Snapshot = Arc<Vec<Arc<SearchItem>>>;

/// In-place edit of a provider's items, replayable onto a later snapshot.
pub type Patch = Arc<dyn Fn(&mut Vec<Arc<SearchItem>>) + Send + Sync>;

/// Corpus slice owned by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Files,
    Commands,
    WorkspaceSymbols,
    DocumentSymbols,
}

impl ProviderKind {
    /// Every kind, in registration order.
    pub const ALL: [Self; 4] = [
        Self::Files,
        Self::Commands,
        Self::WorkspaceSymbols,
        Self::DocumentSymbols,
    ];

    /// Metric and log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Commands => "commands",
            Self::WorkspaceSymbols => "workspace_symbols",
            Self::DocumentSymbols => "document_symbols",
        }
    }

    /// Whether `config` enables this slice.
    #[must_use]
    pub const fn is_enabled(self, config: &Config) -> bool {
        match self {
            Self::Files => config.include_files,
            Self::Commands => config.include_commands,
            Self::WorkspaceSymbols | Self::DocumentSymbols => config.include_symbols,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot, refresh guard and timer shared by every provider.
pub struct ProviderState {
    kind: ProviderKind,
    snapshot: RwLock<Snapshot>,
    in_flight: AtomicUsize,
    /// Ticket of the latest refresh or patch started, and of the latest
    /// refresh stored.
    started: AtomicU64,
    stored: AtomicU64,
    /// Patches applied while a refresh was running, by ticket.
    replay: Mutex<Vec<(u64, Patch)>>,
    last_error: Mutex<Option<String>>,
    debouncer: Debouncer,
}

impl fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderState")
            .field("kind", &self.kind)
            .field("items", &self.snapshot.read().len())
            .field("in_flight", &self.in_flight)
            .field("replay", &self.replay.lock().len())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

/// Marks a refresh in flight until dropped.
struct RefreshGuard<'a>(&'a AtomicUsize);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ProviderState {
    /// Create empty state with a refresh timer of `window`.
    #[must_use]
    pub fn new(kind: ProviderKind, window: Duration) -> Self {
        Self {
            kind,
            snapshot: RwLock::new(Arc::new(Vec::new())),
            in_flight: AtomicUsize::new(0),
            started: AtomicU64::new(0),
            stored: AtomicU64::new(0),
            replay: Mutex::new(Vec::new()),
            last_error: Mutex::new(None),
            debouncer: Debouncer::new(kind.as_str(), window),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.snapshot.read())
    }

    /// Whether a refresh is running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Error of the latest completed refresh, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// The provider's debounced refresh timer.
    #[must_use]
    pub const fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    fn store(&self, slot: &mut Snapshot, items: Vec<Arc<SearchItem>>) {
        INDEXED_ITEMS
            .with_label_values(&[self.kind.as_str()])
            .set(i64::try_from(items.len()).unwrap_or(i64::MAX));
        *slot = Arc::new(items);
    }

    fn next_ticket(&self) -> u64 {
        self.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply(&self, ticket: u64, patch: Patch) {
        let mut slot = self.snapshot.write();
        let mut items = slot.as_ref().clone();
        patch(&mut items);
        self.store(&mut slot, items);
        if self.is_refreshing() {
            self.replay.lock().push((ticket, patch));
        }
    }

    /// Apply `patch` to the snapshot now.
    ///
    /// Refreshes already running apply it again to their result, so a
    /// slower enumeration cannot undo it.
    pub fn patch(&self, patch: Patch) {
        let ticket = self.next_ticket();
        self.apply(ticket, patch);
    }

    /// Like [`patch`](Self::patch), for an edit that needs a lookup first.
    ///
    /// `fetch` returning `None` leaves the snapshot alone. Refreshes started
    /// before the lookup replay the patch.
    pub async fn patch_with<F, Fut>(&self, fetch: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<Patch>>,
    {
        let ticket = self.next_ticket();
        if let Some(patch) = fetch().await {
            self.apply(ticket, patch);
        }
    }

    fn try_begin(&self, force: bool) -> Option<RefreshGuard<'_>> {
        if force {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
        } else if self
            .in_flight
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        Some(RefreshGuard(&self.in_flight))
    }

    /// Run `enumerate` and store its items, unless a refresh is already
    /// running and `force` is false.
    ///
    /// A failed enumeration is logged and leaves the provider empty for the
    /// cycle. When two refreshes overlap, the one started last wins. Patches
    /// applied after it started are replayed onto its result.
    pub async fn refresh_with<F, Fut>(&self, force: bool, enumerate: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Arc<SearchItem>>>>,
    {
        let Some(_guard) = self.try_begin(force) else {
            tracing::debug!(provider = %self.kind, "Refresh already in progress, skipping");
            return;
        };
        let ticket = self.next_ticket();

        let span = spans::refresh_span(self.kind.as_str(), force);
        let (items, outcome, error) = match enumerate().instrument(span).await {
            Ok(items) => (items, "ok", None),
            Err(e) => {
                tracing::warn!(provider = %self.kind, error = %e, "Provider refresh failed");
                (Vec::new(), "error", Some(e.to_string()))
            }
        };
        REFRESH_TOTAL
            .with_label_values(&[self.kind.as_str(), outcome])
            .inc();

        let mut slot = self.snapshot.write();
        let mut replay = self.replay.lock();
        if self.stored.fetch_max(ticket, Ordering::SeqCst) > ticket {
            tracing::debug!(provider = %self.kind, "Discarding superseded refresh");
        } else {
            let mut items = items;
            for (_, patch) in replay.iter().filter(|(patched, _)| *patched > ticket) {
                patch(&mut items);
            }
            *self.last_error.lock() = error;
            tracing::debug!(provider = %self.kind, items = items.len(), "Provider refreshed");
            self.store(&mut slot, items);
        }
        // Last refresh out: nothing left to replay onto
        if self.in_flight.load(Ordering::SeqCst) == 1 {
            replay.clear();
        }
    }
}

/// A registered source provider.
#[derive(Debug, Clone)]
pub enum Provider {
    Files(Arc<FileProvider>),
    Commands(Arc<CommandProvider>),
    WorkspaceSymbols(Arc<WorkspaceSymbolProvider>),
    DocumentSymbols(Arc<DocumentSymbolProvider>),
}

impl Provider {
    /// Slice this provider owns.
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Files(_) => ProviderKind::Files,
            Self::Commands(_) => ProviderKind::Commands,
            Self::WorkspaceSymbols(_) => ProviderKind::WorkspaceSymbols,
            Self::DocumentSymbols(_) => ProviderKind::DocumentSymbols,
        }
    }

    fn state(&self) -> &ProviderState {
        match self {
            Self::Files(p) => p.state(),
            Self::Commands(p) => p.state(),
            Self::WorkspaceSymbols(p) => p.state(),
            Self::DocumentSymbols(p) => p.state(),
        }
    }

    /// Current items, refreshing first when nothing has been enumerated and
    /// no refresh is running.
    pub async fn get_items(&self) -> Snapshot {
        if let Self::Commands(p) = self {
            return p.get_items().await;
        }
        let state = self.state();
        if state.snapshot().is_empty() && !state.is_refreshing() {
            self.refresh(false).await;
        }
        state.snapshot()
    }

    /// Error of the latest completed refresh, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state().last_error()
    }

    /// Whether a refresh is running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.state().is_refreshing()
    }

    /// Latest snapshot without triggering any enumeration.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state().snapshot()
    }

    /// Re-enumerate and replace the snapshot.
    ///
    /// Ignored while another refresh runs unless `force` is set.
    pub async fn refresh(&self, force: bool) {
        match self {
            Self::Files(p) => p.refresh(force).await,
            Self::Commands(p) => p.refresh(force).await,
            Self::WorkspaceSymbols(p) => p.refresh(force).await,
            Self::DocumentSymbols(p) => p.refresh(force).await,
        }
    }

    /// React to a workspace change.
    ///
    /// Must be called from within a tokio runtime.
    pub fn handle_event(&self, event: &WorkspaceEvent) {
        match self {
            Self::Files(p) => FileProvider::handle_event(p, event),
            Self::Commands(_) => {}
            Self::WorkspaceSymbols(p) => WorkspaceSymbolProvider::handle_event(p, event),
            Self::DocumentSymbols(p) => DocumentSymbolProvider::handle_event(p, event),
        }
    }

    /// Release timers. In-flight refreshes run to completion.
    pub fn dispose(&self) {
        self.state().debouncer().cancel();
        tracing::debug!(provider = %self.kind(), "Provider disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::model::SearchItem;
    use std::path::Path;

    fn items(names: &[&str]) -> Vec<Arc<SearchItem>> {
        names
            .iter()
            .map(|n| Arc::new(SearchItem::file(&Path::new("/ws").join(n), n, "file")))
            .collect()
    }

    #[test]
    fn test_kind_enabled_by_config() {
        let mut config = Config::default();
        config.include_symbols = false;
        assert!(ProviderKind::Files.is_enabled(&config));
        assert!(!ProviderKind::WorkspaceSymbols.is_enabled(&config));
        assert!(!ProviderKind::DocumentSymbols.is_enabled(&config));
        assert_eq!(ProviderKind::DocumentSymbols.to_string(), "document_symbols");
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let state = ProviderState::new(ProviderKind::Files, Duration::from_millis(10));
        state
            .refresh_with(false, || async { Ok(items(&["a.rs", "b.rs"])) })
            .await;
        assert_eq!(state.snapshot().len(), 2);
        assert!(!state.is_refreshing());

        state.refresh_with(false, || async { Ok(items(&["c.rs"])) }).await;
        assert_eq!(state.snapshot()[0].label, "c.rs");
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_empty_snapshot() {
        let state = ProviderState::new(ProviderKind::Files, Duration::from_millis(10));
        state.refresh_with(false, || async { Ok(items(&["a.rs"])) }).await;
        state
            .refresh_with(false, || async {
                Err(HostError::SymbolQuery("index unavailable".to_string()).into())
            })
            .await;
        assert!(state.snapshot().is_empty());
        assert!(!state.is_refreshing());
        assert!(state.last_error().unwrap().contains("index unavailable"));

        state.refresh_with(false, || async { Ok(items(&["b.rs"])) }).await;
        assert!(state.last_error().is_none());
    }

    #[tokio::test]
    async fn test_refresh_in_flight_is_not_repeated() {
        let state = Arc::new(ProviderState::new(ProviderKind::Files, Duration::from_millis(10)));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let slow = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                state
                    .refresh_with(false, || async {
                        let _ = rx.await;
                        Ok(items(&["slow.rs"]))
                    })
                    .await;
            })
        };
        tokio::task::yield_now().await;
        assert!(state.is_refreshing());

        // Dropped: a refresh is already running
        state.refresh_with(false, || async { Ok(items(&["skipped.rs"])) }).await;
        assert!(state.snapshot().is_empty());

        // Forced: runs alongside, but the slow refresh started first and loses
        state.refresh_with(true, || async { Ok(items(&["forced.rs"])) }).await;
        assert_eq!(state.snapshot()[0].label, "forced.rs");

        tx.send(()).unwrap();
        slow.await.unwrap();
        assert_eq!(state.snapshot()[0].label, "forced.rs");
        assert!(!state.is_refreshing());
    }

    #[tokio::test]
    async fn test_patch_edits_copy() {
        let state = ProviderState::new(ProviderKind::DocumentSymbols, Duration::from_millis(10));
        state
            .refresh_with(false, || async { Ok(items(&["a.rs", "b.rs"])) })
            .await;
        let before = state.snapshot();
        state.patch(Arc::new(|list: &mut Vec<Arc<SearchItem>>| {
            list.retain(|i| i.label != "a.rs");
        }));
        assert_eq!(before.len(), 2);
        assert_eq!(state.snapshot().len(), 1);
        assert!(state.replay.lock().is_empty());
    }

    #[tokio::test]
    async fn test_patch_survives_slower_refresh() {
        let state = Arc::new(ProviderState::new(
            ProviderKind::DocumentSymbols,
            Duration::from_millis(10),
        ));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let slow = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                state
                    .refresh_with(false, || async {
                        let _ = rx.await;
                        Ok(items(&["a.rs", "stale.rs"]))
                    })
                    .await;
            })
        };
        tokio::task::yield_now().await;
        assert!(state.is_refreshing());

        state
            .patch_with(|| async {
                let patch: Patch = Arc::new(|list: &mut Vec<Arc<SearchItem>>| {
                    list.retain(|i| i.label != "stale.rs");
                    list.extend(items(&["fresh.rs"]));
                });
                Some(patch)
            })
            .await;
        assert_eq!(state.snapshot()[0].label, "fresh.rs");

        tx.send(()).unwrap();
        slow.await.unwrap();
        let mut labels: Vec<String> = state.snapshot().iter().map(|i| i.label.clone()).collect();
        labels.sort();
        assert_eq!(labels, vec!["a.rs", "fresh.rs"]);
        assert!(state.replay.lock().is_empty());
    }

    #[tokio::test]
    async fn test_patch_from_before_refresh_not_replayed() {
        let state = ProviderState::new(ProviderKind::DocumentSymbols, Duration::from_millis(10));
        state.patch(Arc::new(|list: &mut Vec<Arc<SearchItem>>| {
            list.extend(items(&["old.rs"]));
        }));
        state.refresh_with(false, || async { Ok(items(&["a.rs"])) }).await;
        assert_eq!(state.snapshot().len(), 1);
        assert_eq!(state.snapshot()[0].label, "a.rs");
    }
}
