//! Result ordering and recency boosting.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::recency::{recency_factor, RecencyMap};
use crate::model::{ItemType, RankedItem, PRIORITY_DEFAULT};

/// Score difference below which priority decides the order.
pub const SCORE_BAND: f64 = 0.1;

/// Fraction of the activity weight applied to symbol and class items.
pub const SYMBOL_RECENCY_SHARE: f64 = 0.5;

fn priority_of(item: &RankedItem) -> i32 {
    match item.item.priority {
        0 => PRIORITY_DEFAULT,
        p => p,
    }
}

/// Higher priority first.
#[must_use]
pub fn compare_priority(a: &RankedItem, b: &RankedItem) -> Ordering {
    priority_of(b).cmp(&priority_of(a))
}

/// Higher score first when scores differ by more than [`SCORE_BAND`],
/// otherwise higher priority first.
///
/// Not transitive: sort with [`merge_sort_by`], never with `slice::sort_by`.
#[must_use]
pub fn compare_ranked(a: &RankedItem, b: &RankedItem) -> Ordering {
    if let (Some(sa), Some(sb)) = (a.score, b.score) {
        if (sa - sb).abs() > SCORE_BAND {
            return sb.partial_cmp(&sa).unwrap_or(Ordering::Equal);
        }
    }
    compare_priority(a, b)
}

/// Stable bottom-up merge sort.
///
/// Terminates and keeps every element for any comparator, including ones
/// that are not a total order.
pub fn merge_sort_by<T, F>(items: &mut [T], mut cmp: F)
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    let len = items.len();
    if len < 2 {
        return;
    }

    let mut buffer = items.to_vec();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            merge(&items[start..mid], &items[mid..end], &mut buffer[start..end], &mut cmp);
            start = end;
        }
        items.clone_from_slice(&buffer);
        width *= 2;
    }
}

fn merge<T, F>(left: &[T], right: &[T], out: &mut [T], cmp: &mut F)
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    let (mut i, mut j) = (0, 0);
    for slot in out.iter_mut() {
        // Right side only moves ahead when strictly smaller
        let take_right =
            i >= left.len() || (j < right.len() && cmp(&right[j], &left[i]) == Ordering::Less);
        if take_right {
            slot.clone_from(&right[j]);
            j += 1;
        } else {
            slot.clone_from(&left[i]);
            i += 1;
        }
    }
}

/// Sort results into their final order.
pub fn sort_results(results: &mut [RankedItem]) {
    merge_sort_by(results, compare_ranked);
}

/// Multiply the scores of recently used files and symbols.
///
/// Files gain up to `weight`, symbols and classes up to half of it. Items
/// without a score or without a recorded access are untouched.
pub fn apply_recency_boost(
    results: &mut [RankedItem],
    recency: &RecencyMap,
    weight: f64,
    now: DateTime<Utc>,
) {
    if recency.is_empty() {
        return;
    }
    for result in results.iter_mut() {
        let Some(score) = result.score else {
            continue;
        };
        let share = match result.item.item_type() {
            ItemType::File => 1.0,
            ItemType::Symbol | ItemType::Class => SYMBOL_RECENCY_SHARE,
            ItemType::Command | ItemType::TextMatch => continue,
        };
        let Some(accessed) = result.item.uri().and_then(|uri| recency.get(uri)) else {
            continue;
        };
        let factor = recency_factor(accessed, now);
        result.score = Some(score * (1.0 + factor * weight * share));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Range, SearchItem, SymbolKind};
    use chrono::Duration;
    use std::path::Path;
    use std::sync::Arc;

    fn file(name: &str, score: Option<f64>) -> RankedItem {
        RankedItem::new(
            Arc::new(SearchItem::file(&Path::new("/ws").join(name), name, "file")),
            score,
        )
    }

    fn with_priority(label: &str, priority: i32, score: Option<f64>) -> RankedItem {
        let mut item = SearchItem::command(label, label);
        item.priority = priority;
        RankedItem::new(Arc::new(item), score)
    }

    fn labels(results: &[RankedItem]) -> Vec<&str> {
        results.iter().map(|r| r.item.label.as_str()).collect()
    }

    #[test]
    fn test_priority_breaks_close_scores() {
        let low = with_priority("low", 40, Some(0.95));
        let high = with_priority("high", 100, Some(0.90));
        assert_eq!(compare_ranked(&low, &high), Ordering::Greater);
        assert_eq!(compare_ranked(&high, &low), Ordering::Less);
    }

    #[test]
    fn test_decisive_score_gap_beats_priority() {
        let strong = with_priority("strong", 30, Some(0.9));
        let weak = with_priority("weak", 100, Some(0.5));
        assert_eq!(compare_ranked(&strong, &weak), Ordering::Less);
    }

    #[test]
    fn test_unscored_compares_by_priority() {
        let a = with_priority("a", 50, None);
        let b = with_priority("b", 90, Some(0.1));
        assert_eq!(compare_ranked(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_unset_priority_defaults_to_neutral() {
        let unset = with_priority("unset", 0, None);
        let low = with_priority("low", 40, None);
        assert_eq!(compare_priority(&unset, &low), Ordering::Less);
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let mut results = vec![
            with_priority("a", 50, None),
            with_priority("b", 90, None),
            with_priority("c", 50, None),
            with_priority("d", 90, None),
            with_priority("e", 50, None),
        ];
        merge_sort_by(&mut results, compare_priority);
        assert_eq!(labels(&results), vec!["b", "d", "a", "c", "e"]);
    }

    #[test]
    fn test_sort_tolerates_non_transitive_band() {
        // a~b and b~c fall within the band, a vs c does not
        let mut results: Vec<RankedItem> = (0..200)
            .map(|i| {
                let score = f64::from(i % 17) * 0.07;
                with_priority(&format!("item{i}"), 30 + (i * 7) % 70, Some(score))
            })
            .collect();
        sort_results(&mut results);
        assert_eq!(results.len(), 200);
    }

    #[test]
    fn test_boost_matches_expected_factor() {
        let now = Utc::now();
        let mut recency = RecencyMap::default();
        let item = file("a.ts", Some(1.0));
        recency.record(item.item.uri().unwrap(), now - Duration::minutes(10));

        let mut results = vec![item, file("b.ts", Some(1.0))];
        apply_recency_boost(&mut results, &recency, 0.5, now);

        let expected = 1.0 + (1.0 - 10.0 / 60.0) * 0.5;
        assert!((results[0].score.unwrap() - expected).abs() < 1e-9);
        assert!((expected - 1.4167).abs() < 1e-4);
        assert!((results[1].score.unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_boost_halved_for_symbols() {
        let now = Utc::now();
        let uri = "file:///ws/a.ts";
        let mut recency = RecencyMap::default();
        recency.record(uri, now);

        let symbol = SearchItem::symbol("Foo", SymbolKind::Class, uri, Range::on_line(0, 0, 3), "", None);
        let mut results = vec![RankedItem::new(Arc::new(symbol), Some(0.8))];
        apply_recency_boost(&mut results, &recency, 0.5, now);
        assert!((results[0].score.unwrap() - 0.8 * 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_boost_monotonic_in_age() {
        let now = Utc::now();
        let boosted: Vec<f64> = [0, 15, 30, 45, 60, 90]
            .iter()
            .map(|minutes| {
                let item = file("a.ts", Some(0.6));
                let mut recency = RecencyMap::default();
                recency.record(item.item.uri().unwrap(), now - Duration::minutes(*minutes));
                let mut results = vec![item];
                apply_recency_boost(&mut results, &recency, 0.5, now);
                results[0].score.unwrap()
            })
            .collect();

        assert!(boosted.iter().all(|s| *s >= 0.6));
        assert!(boosted[..5].windows(2).all(|w| w[0] > w[1]));
        assert!((boosted[4] - 0.6).abs() < 1e-9);
        assert!((boosted[5] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_unscored_items_not_boosted() {
        let now = Utc::now();
        let item = file("a.ts", None);
        let mut recency = RecencyMap::default();
        recency.record(item.item.uri().unwrap(), now);
        let mut results = vec![item];
        apply_recency_boost(&mut results, &recency, 0.5, now);
        assert!(results[0].score.is_none());
    }
}
