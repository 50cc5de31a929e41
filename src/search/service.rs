//! Aggregation and ranking engine.
//!
//! The service owns the registered providers, merges their snapshots into a
//! deduplicated aggregate and answers queries against it. Workspace events
//! fan out to providers, which refresh on their own timers; the aggregate
//! re-reads their snapshots on a longer timer so providers settle first.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::Instrument;

use super::dedup::DedupIndex;
use super::fuzzy::{create_scorer, FuzzyScorer};
use super::ranking::{apply_recency_boost, compare_priority, merge_sort_by, sort_results};
use super::recency::RecencyMap;
use super::text::{TextMatcher, TEXT_MATCH_SCORE};
use crate::config::Config;
use crate::error::ProviderError;
use crate::host::Host;
use crate::model::RankedItem;
use crate::providers::{
    CommandProvider, DocumentSymbolProvider, FileProvider, Provider, ProviderKind, Snapshot,
    WorkspaceSymbolProvider,
};
use crate::scheduler::Debouncer;
use crate::telemetry::{spans, AGGREGATE_SIZE, SEARCH_LATENCY};
use crate::watcher::{ExclusionFilter, WorkspaceEvent};
use crate::{Error, Result};

/// Fuzzy matches kept per requested result, leaving room for recency to
/// promote items from just below the cut.
pub const SCORER_LIMIT_FACTOR: usize = 2;

/// Outcome of refreshing one provider during a rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStats {
    pub provider: &'static str,
    pub items: usize,
    pub error: Option<String>,
}

/// Result of [`SearchService::rebuild_index`].
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub providers: Vec<ProviderStats>,
    /// Items in the aggregate after deduplication.
    pub total: usize,
    pub duplicates: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_millis<S>(elapsed: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u128(elapsed.as_millis())
}

/// Point-in-time view of the service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub aggregate: usize,
    pub providers: BTreeMap<&'static str, usize>,
    pub refreshing: Vec<&'static str>,
    pub recent: usize,
    pub scorer: &'static str,
}

/// Search engine over every enabled corpus slice.
pub struct SearchService {
    host: Arc<dyn Host>,
    config: RwLock<Config>,
    providers: RwLock<Vec<Provider>>,
    aggregate: RwLock<Snapshot>,
    scorer: RwLock<Arc<dyn FuzzyScorer>>,
    text: TextMatcher,
    recency: Mutex<RecencyMap>,
    /// Last resource reported active, recorded when the activity window elapses.
    pending_activity: Mutex<Option<String>>,
    activity_debouncer: Debouncer,
    index_debouncer: Debouncer,
}

impl fmt::Debug for SearchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchService")
            .field("providers", &*self.providers.read())
            .field("aggregate", &self.aggregate.read().len())
            .field("scorer", &self.scorer.read().name())
            .finish_non_exhaustive()
    }
}

fn create_provider(
    host: &Arc<dyn Host>,
    kind: ProviderKind,
    filter: &ExclusionFilter,
    window: Duration,
) -> Provider {
    let host = Arc::clone(host);
    let filter = filter.clone();
    match kind {
        ProviderKind::Files => Provider::Files(Arc::new(FileProvider::new(host, filter, window))),
        ProviderKind::Commands => Provider::Commands(Arc::new(CommandProvider::new(host, window))),
        ProviderKind::WorkspaceSymbols => Provider::WorkspaceSymbols(Arc::new(
            WorkspaceSymbolProvider::new(host, filter, window),
        )),
        ProviderKind::DocumentSymbols => Provider::DocumentSymbols(Arc::new(
            DocumentSymbolProvider::new(host, filter, window),
        )),
    }
}

impl SearchService {
    /// Create a service with a provider per enabled slice.
    ///
    /// Nothing is enumerated until the first refresh or search.
    #[must_use]
    pub fn new(host: Arc<dyn Host>, config: Config) -> Arc<Self> {
        let config = config.sanitized();
        let filter = ExclusionFilter::new(&config.exclude);
        let providers = ProviderKind::ALL
            .into_iter()
            .filter(|kind| kind.is_enabled(&config))
            .map(|kind| create_provider(&host, kind, &filter, config.debounce.provider()))
            .collect();

        tracing::info!(
            scorer = %config.fuzzy_search,
            max_results = config.max_results,
            "Search service created"
        );

        Arc::new(Self {
            text: TextMatcher::new(Arc::clone(&host), filter, config.max_text_results),
            scorer: RwLock::new(create_scorer(&config.fuzzy_search)),
            activity_debouncer: Debouncer::new("activity", config.debounce.activity()),
            index_debouncer: Debouncer::new("index", config.debounce.index()),
            host,
            config: RwLock::new(config),
            providers: RwLock::new(providers),
            aggregate: RwLock::new(Arc::new(Vec::new())),
            recency: Mutex::new(RecencyMap::default()),
            pending_activity: Mutex::new(None),
        })
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Current deduplicated aggregate.
    #[must_use]
    pub fn aggregate(&self) -> Snapshot {
        Arc::clone(&self.aggregate.read())
    }

    /// Kinds of the registered providers, in merge order.
    #[must_use]
    pub fn provider_kinds(&self) -> Vec<ProviderKind> {
        self.providers.read().iter().map(Provider::kind).collect()
    }

    fn providers(&self) -> Vec<Provider> {
        self.providers.read().clone()
    }

    /// Rebuild the aggregate from every provider.
    ///
    /// With `force`, each provider re-enumerates first; otherwise providers
    /// only enumerate when they have nothing yet.
    pub async fn refresh(&self, force: bool) {
        let providers = self.providers();
        let snapshots = join_all(providers.iter().map(|provider| async move {
            if force {
                provider.refresh(true).await;
                provider.snapshot()
            } else {
                provider.get_items().await
            }
        }))
        .await;
        self.merge(snapshots);
    }

    /// Rebuild the aggregate from the providers' cached snapshots.
    pub fn update_incremental(&self) {
        let snapshots = self.providers().iter().map(Provider::snapshot).collect();
        self.merge(snapshots);
    }

    /// Merge snapshots in provider order, first item per key wins.
    fn merge(&self, snapshots: Vec<Snapshot>) -> (usize, usize) {
        let capacity = snapshots.iter().map(|s| s.len()).sum();
        let mut index = DedupIndex::with_capacity(capacity);
        let duplicates: usize = snapshots
            .iter()
            .map(|snapshot| index.extend(snapshot.iter()))
            .sum();

        let items = index.into_items();
        let total = items.len();
        AGGREGATE_SIZE.set(i64::try_from(total).unwrap_or(i64::MAX));
        *self.aggregate.write() = Arc::new(items);
        tracing::debug!(items = total, duplicates, "Aggregate rebuilt");
        (total, duplicates)
    }

    /// Ranked results for `query`, capped at the configured maximum.
    pub async fn search(&self, query: &str) -> Vec<RankedItem> {
        let started = Instant::now();
        let shape = if query.trim().is_empty() { "empty" } else { "text" };
        let results = self
            .ranked(query.trim())
            .instrument(spans::search_span(query))
            .await;
        SEARCH_LATENCY
            .with_label_values(&[shape])
            .observe(started.elapsed().as_secs_f64());
        tracing::debug!(query, results = results.len(), "Search complete");
        results
    }

    async fn ranked(&self, query: &str) -> Vec<RankedItem> {
        let empty = self.aggregate.read().is_empty();
        if empty {
            self.refresh(false).await;
        }
        let config = self.config();
        let aggregate = self.aggregate();

        if query.is_empty() {
            let mut results: Vec<RankedItem> =
                aggregate.iter().cloned().map(RankedItem::unscored).collect();
            merge_sort_by(&mut results, compare_priority);
            results.truncate(config.max_results);
            return results;
        }

        let mut results = Vec::new();
        if config.include_text {
            let matches = self.text.search(query).await;
            results.extend(
                matches
                    .iter()
                    .map(|item| RankedItem::new(Arc::clone(item), Some(TEXT_MATCH_SCORE))),
            );
        }

        let scorer = Arc::clone(&*self.scorer.read());
        let limit = config.max_results.saturating_mul(SCORER_LIMIT_FACTOR);
        results.extend(scorer.search(&aggregate, query, limit));

        if config.activity_tracking {
            let recency = self.recency.lock();
            apply_recency_boost(&mut results, &recency, config.activity_weight, Utc::now());
        }
        sort_results(&mut results);
        results.truncate(config.max_results);
        results
    }

    /// Perform the action of a selected result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Action`] if the host fails to perform it.
    pub async fn accept(&self, result: &RankedItem) -> Result<()> {
        let item = &result.item;
        self.host.execute(&item.action).await.map_err(|e| {
            tracing::error!(item = %item.id, error = %e, "Action failed");
            Error::action(format!("{}: {e}", item.label))
        })?;
        tracing::debug!(item = %item.id, "Action performed");
        Ok(())
    }

    /// Record an access to `uri` now.
    pub fn record_activity(&self, uri: &str) {
        self.record_activity_at(uri, Utc::now());
    }

    /// Record an access to `uri` at `at`.
    pub fn record_activity_at(&self, uri: &str, at: DateTime<Utc>) {
        let mut recency = self.recency.lock();
        recency.record(uri, at);
        tracing::trace!(uri, tracked = recency.len(), "Activity recorded");
    }

    /// Forget all recorded activity.
    pub fn clear_activity(&self) {
        self.recency.lock().clear();
    }

    /// React to a workspace change.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn handle_event(self: &Arc<Self>, event: &WorkspaceEvent) {
        if let WorkspaceEvent::ConfigurationChanged(config) = event {
            self.update_configuration(config.as_ref().clone()).await;
            return;
        }
        tracing::trace!(?event, "Workspace event");

        for provider in self.providers() {
            provider.handle_event(event);
        }

        match event {
            WorkspaceEvent::WorkspaceFoldersChanged(_) => {
                self.text.cancel();
                let this = Arc::clone(self);
                self.index_debouncer.schedule(async move {
                    this.refresh(true).await;
                });
            }
            WorkspaceEvent::DocumentSaved(_) | WorkspaceEvent::DocumentClosed(_) => {
                if matches!(event, WorkspaceEvent::DocumentSaved(_)) {
                    self.text.cancel();
                }
                self.schedule_incremental();
            }
            e if e.changes_file_set() => {
                self.text.cancel();
                self.schedule_incremental();
            }
            _ => {}
        }

        if let WorkspaceEvent::DocumentSaved(uri) | WorkspaceEvent::ActiveEditorChanged(uri) = event {
            self.schedule_activity(uri);
        }
    }

    fn schedule_incremental(self: &Arc<Self>) {
        let this = Arc::clone(self);
        self.index_debouncer.schedule(async move {
            this.update_incremental();
        });
    }

    fn schedule_activity(self: &Arc<Self>, uri: &str) {
        if !self.config.read().activity_tracking {
            return;
        }
        *self.pending_activity.lock() = Some(uri.to_string());
        let this = Arc::clone(self);
        self.activity_debouncer.schedule(async move {
            let pending = this.pending_activity.lock().take();
            if let Some(uri) = pending {
                this.record_activity(&uri);
            }
        });
    }

    /// Apply a new configuration.
    ///
    /// Providers of slices switched off are dropped, newly enabled slices get
    /// providers, and changed exclusions recreate every provider. The
    /// aggregate is rebuilt whenever the slice set changed.
    pub async fn update_configuration(&self, config: Config) {
        let config = config.sanitized();
        let previous = std::mem::replace(&mut *self.config.write(), config.clone());
        let filter = ExclusionFilter::new(&config.exclude);

        if previous.fuzzy_search != config.fuzzy_search {
            *self.scorer.write() = create_scorer(&config.fuzzy_search);
        }
        self.text.configure(filter.clone(), config.max_text_results);
        if !config.activity_tracking {
            self.pending_activity.lock().take();
            self.activity_debouncer.cancel();
        }

        if !config.slices_differ(&previous) && config.debounce == previous.debounce {
            tracing::info!("Configuration updated");
            return;
        }

        let recreate = previous.exclude != config.exclude || previous.debounce != config.debounce;
        {
            let mut providers = self.providers.write();
            let mut current: Vec<Provider> = std::mem::take(&mut *providers);
            for kind in ProviderKind::ALL {
                if !kind.is_enabled(&config) {
                    continue;
                }
                let existing = current.iter().position(|p| p.kind() == kind);
                let provider = match existing {
                    Some(i) if !recreate => current.remove(i),
                    _ => create_provider(&self.host, kind, &filter, config.debounce.provider()),
                };
                providers.push(provider);
            }
            for dropped in current {
                dropped.dispose();
            }
        }

        tracing::info!(providers = ?self.provider_kinds(), recreate, "Provider set updated");
        self.refresh(true).await;
    }

    /// Force every provider to re-enumerate and rebuild the aggregate,
    /// reporting each provider as it completes.
    ///
    /// # Errors
    ///
    /// Returns an error if every provider failed.
    pub async fn rebuild_index<F>(&self, mut progress: F) -> Result<IndexStats>
    where
        F: FnMut(&ProviderStats) + Send,
    {
        let started = Instant::now();
        let providers = self.providers();

        let (snapshots, stats) = async {
            let mut snapshots = Vec::with_capacity(providers.len());
            let mut stats = Vec::with_capacity(providers.len());
            for provider in &providers {
                provider.refresh(true).await;
                let snapshot = provider.snapshot();
                let provider_stats = ProviderStats {
                    provider: provider.kind().as_str(),
                    items: snapshot.len(),
                    error: provider.last_error(),
                };
                progress(&provider_stats);
                stats.push(provider_stats);
                snapshots.push(snapshot);
            }
            (snapshots, stats)
        }
        .instrument(spans::rebuild_span())
        .await;

        let (total, duplicates) = self.merge(snapshots);
        let failures: Vec<String> = stats
            .iter()
            .filter_map(|s| s.error.as_ref().map(|e| format!("{}: {e}", s.provider)))
            .collect();
        if !stats.is_empty() && failures.len() == stats.len() {
            tracing::error!(failures = failures.len(), "Index rebuild failed");
            return Err(ProviderError::Enumeration {
                provider: "index",
                reason: failures.join("; "),
            }
            .into());
        }

        let elapsed = started.elapsed();
        tracing::info!(
            total,
            duplicates,
            failed = failures.len(),
            elapsed_ms = elapsed.as_millis(),
            "Index rebuilt"
        );
        Ok(IndexStats {
            providers: stats,
            total,
            duplicates,
            elapsed,
        })
    }

    /// Sizes of the aggregate and each provider snapshot.
    #[must_use]
    pub fn stats(&self) -> ServiceStats {
        let providers = self.providers();
        ServiceStats {
            aggregate: self.aggregate.read().len(),
            providers: providers
                .iter()
                .map(|p| (p.kind().as_str(), p.snapshot().len()))
                .collect(),
            refreshing: providers
                .iter()
                .filter(|p| p.is_refreshing())
                .map(|p| p.kind().as_str())
                .collect(),
            recent: self.recency.lock().len(),
            scorer: self.scorer.read().name(),
        }
    }

    /// Cancel timers and text scans and release providers.
    pub fn shutdown(&self) {
        self.activity_debouncer.cancel();
        self.index_debouncer.cancel();
        self.text.cancel();
        for provider in self.providers.write().drain(..) {
            provider.dispose();
        }
        tracing::info!("Search service shut down");
    }
}
