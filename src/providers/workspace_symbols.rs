//! Workspace symbol provider: symbols from the host's global index.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::symbols::{display_path, symbol_item};
use super::{ProviderKind, ProviderState};
use crate::host::{Host, SymbolInformation};
use crate::model::SearchItem;
use crate::watcher::{ExclusionFilter, WorkspaceEvent};
use crate::Result;

/// Supplemental first-character queries issued after the empty query.
///
/// Symbol indexes commonly cap or truncate their answer to an empty query, so
/// a single request does not return the whole symbol universe. Querying one
/// bucket per leading character and taking the union recovers what the empty
/// query left out. Dropping these buckets silently loses symbols on hosts with
/// that behavior.
pub const SYMBOL_QUERY_BUCKETS: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z", "_", "$", "*",
];

/// Lists symbols from the global symbol index.
pub struct WorkspaceSymbolProvider {
    host: Arc<dyn Host>,
    filter: ExclusionFilter,
    state: ProviderState,
}

impl fmt::Debug for WorkspaceSymbolProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceSymbolProvider")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

type SymbolIdentity = (String, String, u32, u32);

fn identity(info: &SymbolInformation) -> SymbolIdentity {
    (
        info.name.clone(),
        info.uri.clone(),
        info.range.start.line,
        info.range.start.column,
    )
}

impl WorkspaceSymbolProvider {
    #[must_use]
    pub fn new(host: Arc<dyn Host>, filter: ExclusionFilter, window: Duration) -> Self {
        Self {
            host,
            filter,
            state: ProviderState::new(ProviderKind::WorkspaceSymbols, window),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ProviderState {
        &self.state
    }

    pub async fn refresh(&self, force: bool) {
        self.state.refresh_with(force, || self.enumerate()).await;
    }

    async fn enumerate(&self) -> Result<Vec<Arc<SearchItem>>> {
        // The base query must succeed; buckets only add recall
        let mut symbols = self.host.workspace_symbols("").await?;
        let mut seen: HashSet<SymbolIdentity> = symbols.iter().map(identity).collect();
        let base = symbols.len();

        for bucket in SYMBOL_QUERY_BUCKETS {
            match self.host.workspace_symbols(bucket).await {
                Ok(found) => {
                    for info in found {
                        if seen.insert(identity(&info)) {
                            symbols.push(info);
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(bucket, error = %e, "Symbol bucket query failed");
                }
            }
        }
        tracing::debug!(
            base,
            total = symbols.len(),
            "Merged bucketed workspace symbol queries"
        );

        let roots = self.host.workspace_roots();
        let filter = self.filter.clone().with_roots(roots.iter().cloned());
        Ok(symbols
            .iter()
            .filter(|info| !filter.should_exclude_uri(&info.uri))
            .map(|info| Arc::new(symbol_item(info, &display_path(&roots, &info.uri))))
            .collect())
    }

    /// Schedule a refresh after file or document changes.
    pub fn handle_event(this: &Arc<Self>, event: &WorkspaceEvent) {
        if !(event.changes_file_set() || matches!(event, WorkspaceEvent::DocumentSaved(_))) {
            return;
        }
        let provider = Arc::clone(this);
        this.state.debouncer().schedule(async move {
            provider.refresh(false).await;
        });
    }
}
