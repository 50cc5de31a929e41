//! Search core: deduplication, scoring, ranking and the service tying them
//! to the providers.

mod dedup;
mod fuzzy;
mod ranking;
mod recency;
mod service;
mod text;

pub use dedup::{dedup_key, normalize_label, DedupIndex};
pub use fuzzy::{create_scorer, FrizbeeScorer, FuzzyScorer, NucleoScorer, FALLBACK_SCORER};
pub use ranking::{
    apply_recency_boost, compare_priority, compare_ranked, merge_sort_by, sort_results,
    SCORE_BAND, SYMBOL_RECENCY_SHARE,
};
pub use recency::{recency_factor, recency_horizon, RecencyMap, RECENCY_CAPACITY};
pub use service::{IndexStats, ProviderStats, SearchService, ServiceStats, SCORER_LIMIT_FACTOR};
pub use text::{TextMatcher, TextMatches, TEXT_MATCH_SCORE};
