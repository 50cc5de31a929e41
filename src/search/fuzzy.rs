//! Pluggable fuzzy scorers.
//!
//! A scorer takes the aggregate and a query and returns the best matching
//! prefix, each result carrying a score normalized onto `(0, 1]` where `1`
//! is the best match of the batch. Items are never mutated.
//!
//! The label is matched on its own. Description and detail only count
//! through the composite text, at [`SECONDARY_WEIGHT`] of its raw score, so
//! an item whose label misses never outranks one whose label hits.

use std::fmt;
use std::sync::Arc;

use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32Str};

use crate::model::{RankedItem, SearchItem};

/// Scorer used when the configured name is not recognized.
pub const FALLBACK_SCORER: &str = "nucleo";

/// Share of the composite-text score an item keeps when its label misses.
pub const SECONDARY_WEIGHT: f64 = 0.5;

/// Ranks items against a query.
pub trait FuzzyScorer: Send + Sync + fmt::Debug {
    /// Name the scorer is selected by.
    fn name(&self) -> &'static str;

    /// Return at most `limit` matches, best first.
    ///
    /// An empty query returns the first `limit` items unscored.
    fn search(&self, items: &[Arc<SearchItem>], query: &str, limit: usize) -> Vec<RankedItem>;
}

/// Select a scorer by name, falling back to [`FALLBACK_SCORER`].
#[must_use]
pub fn create_scorer(name: &str) -> Arc<dyn FuzzyScorer> {
    match name.trim().to_lowercase().as_str() {
        "nucleo" => Arc::new(NucleoScorer),
        "frizbee" => Arc::new(FrizbeeScorer),
        other => {
            tracing::warn!(scorer = other, fallback = FALLBACK_SCORER, "Unknown fuzzy scorer");
            Arc::new(NucleoScorer)
        }
    }
}

fn passthrough(items: &[Arc<SearchItem>], limit: usize) -> Vec<RankedItem> {
    items
        .iter()
        .take(limit)
        .map(|item| RankedItem::unscored(Arc::clone(item)))
        .collect()
}

/// Per-item raw score: the label score, or the discounted composite score
/// if that is higher.
fn blend(
    len: usize,
    label: impl IntoIterator<Item = (usize, u32)>,
    composite: impl IntoIterator<Item = (usize, u32)>,
) -> Vec<(usize, u32)> {
    let mut best = vec![0_u32; len];
    for (index, raw) in label {
        best[index] = best[index].max(raw);
    }
    for (index, raw) in composite {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let discounted = (f64::from(raw) * SECONDARY_WEIGHT) as u32;
        best[index] = best[index].max(discounted);
    }
    best.into_iter().enumerate().filter(|(_, raw)| *raw > 0).collect()
}

/// Order `(index, raw)` matches by descending raw score and normalize
/// against the best one. Equal scores keep corpus order.
fn rank(items: &[Arc<SearchItem>], mut matches: Vec<(usize, u32)>, limit: usize) -> Vec<RankedItem> {
    matches.retain(|(_, raw)| *raw > 0);
    matches.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    matches.truncate(limit);

    let Some(best) = matches.first().map(|(_, raw)| f64::from(*raw)) else {
        return Vec::new();
    };
    matches
        .into_iter()
        .map(|(index, raw)| RankedItem::new(Arc::clone(&items[index]), Some(f64::from(raw) / best)))
        .collect()
}

/// Smith-Waterman style scorer from `nucleo-matcher`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NucleoScorer;

impl FuzzyScorer for NucleoScorer {
    fn name(&self) -> &'static str {
        "nucleo"
    }

    fn search(&self, items: &[Arc<SearchItem>], query: &str, limit: usize) -> Vec<RankedItem> {
        let query = query.trim();
        if query.is_empty() {
            return passthrough(items, limit);
        }

        let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);
        let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
        let mut buf = Vec::with_capacity(64);

        let mut score = |text: &str| {
            buf.clear();
            pattern.score(Utf32Str::new(text, &mut buf), &mut matcher)
        };
        let mut label = Vec::new();
        let mut composite = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if let Some(raw) = score(item.label.as_str()) {
                label.push((index, raw));
            }
            if let Some(raw) = score(item.search_text().as_str()) {
                composite.push((index, raw));
            }
        }
        rank(items, blend(items.len(), label, composite), limit)
    }
}

/// SIMD typo-tolerant scorer from `frizbee`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrizbeeScorer;

/// Typo budget grows with query length, never reaching the length itself.
fn frizbee_config(query: &str) -> frizbee::Config {
    let length = query.chars().count();
    let typos: u16 = match length {
        0..=4 => 0,
        5..=7 => 1,
        8..=12 => 2,
        _ => 3,
    };
    frizbee::Config {
        prefilter: true,
        max_typos: Some(typos),
        sort: false,
        ..frizbee::Config::default()
    }
}

impl FuzzyScorer for FrizbeeScorer {
    fn name(&self) -> &'static str {
        "frizbee"
    }

    fn search(&self, items: &[Arc<SearchItem>], query: &str, limit: usize) -> Vec<RankedItem> {
        let query = query.trim();
        if query.is_empty() {
            return passthrough(items, limit);
        }

        let config = frizbee_config(query);
        let run = |haystacks: &[&str]| {
            frizbee::match_list(query, haystacks, &config)
                .into_iter()
                .map(|m| (m.index as usize, u32::from(m.score)))
                .collect::<Vec<_>>()
        };

        let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
        let texts: Vec<String> = items.iter().map(|item| item.search_text()).collect();
        let composites: Vec<&str> = texts.iter().map(String::as_str).collect();

        rank(items, blend(items.len(), run(&labels), run(&composites)), limit)
    }
}
