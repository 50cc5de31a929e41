//! On-demand text matching over workspace files.
//!
//! There is no persistent index: every new query scans the workspace. At
//! most one scan is current. Identical queries share it, and a different
//! query cancels it between files before starting its own.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::host::{workspace_relative, Host};
use crate::model::{file_uri, Range, SearchItem};
use crate::telemetry::TEXT_SEARCH_CANCELLED;
use crate::watcher::ExclusionFilter;

/// Score of every text match. It ties the best fuzzy hit, so the low
/// [`PRIORITY_TEXT_MATCH`](crate::model::PRIORITY_TEXT_MATCH) sorts text
/// matches after fuzzy hits within the score band and ahead of weaker ones.
pub const TEXT_MATCH_SCORE: f64 = 1.0;

/// Matches of one scan, in file and line order.
pub type TextMatches = Arc<Vec<Arc<SearchItem>>>;

struct InFlight {
    query: String,
    token: CancellationToken,
    results: Shared<BoxFuture<'static, TextMatches>>,
}

/// Case-insensitive line matcher with cancel-and-restart semantics.
pub struct TextMatcher {
    host: Arc<dyn Host>,
    filter: RwLock<ExclusionFilter>,
    max_results: AtomicUsize,
    current: Mutex<Option<InFlight>>,
}

impl fmt::Debug for TextMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextMatcher")
            .field("max_results", &self.max_results)
            .field(
                "query",
                &self.current.lock().as_ref().map(|run| run.query.clone()),
            )
            .finish_non_exhaustive()
    }
}

impl TextMatcher {
    #[must_use]
    pub fn new(host: Arc<dyn Host>, filter: ExclusionFilter, max_results: usize) -> Self {
        Self {
            host,
            filter: RwLock::new(filter),
            max_results: AtomicUsize::new(max_results.max(1)),
            current: Mutex::new(None),
        }
    }

    /// Lines containing `query`, ignoring case, at most one match per line.
    ///
    /// An empty query cancels any scan and returns nothing. A cancelled
    /// scan resolves to an empty list.
    pub async fn search(&self, query: &str) -> TextMatches {
        let query = query.trim();
        if query.is_empty() {
            self.cancel();
            return TextMatches::default();
        }

        let results = {
            let mut current = self.current.lock();
            match current.as_ref() {
                Some(run) if run.query == query => run.results.clone(),
                _ => {
                    if let Some(stale) = current.take() {
                        Self::abandon(stale);
                    }
                    let run = self.start(query);
                    let results = run.results.clone();
                    *current = Some(run);
                    results
                }
            }
        };
        results.await
    }

    fn start(&self, query: &str) -> InFlight {
        let token = CancellationToken::new();
        let scan = scan(
            Arc::clone(&self.host),
            self.filter.read().clone(),
            query.to_string(),
            self.max_results.load(Ordering::Relaxed),
            token.clone(),
        );
        tracing::debug!(query, "Starting text search");
        InFlight {
            query: query.to_string(),
            token,
            results: scan.boxed().shared(),
        }
    }

    fn abandon(run: InFlight) {
        run.token.cancel();
        if run.results.peek().is_none() {
            TEXT_SEARCH_CANCELLED.inc();
            tracing::debug!(query = %run.query, "Cancelled stale text search");
        }
    }

    /// Cancel the running scan and forget cached results.
    pub fn cancel(&self) {
        if let Some(run) = self.current.lock().take() {
            Self::abandon(run);
        }
    }

    /// Apply new exclusions and result cap to later scans.
    pub fn configure(&self, filter: ExclusionFilter, max_results: usize) {
        *self.filter.write() = filter;
        self.max_results.store(max_results.max(1), Ordering::Relaxed);
        self.cancel();
    }
}

async fn scan(
    host: Arc<dyn Host>,
    filter: ExclusionFilter,
    query: String,
    max_results: usize,
    token: CancellationToken,
) -> TextMatches {
    let roots = host.workspace_roots();
    let filter = filter.with_roots(roots.iter().cloned());
    let needle: Vec<char> = query.chars().collect();
    let mut matches = Vec::new();

    'roots: for root in &roots {
        let files = match host.find_files(root, &filter).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "Skipping root in text search");
                continue;
            }
        };

        for path in files {
            if token.is_cancelled() {
                return TextMatches::default();
            }
            if filter.should_exclude(&path) {
                continue;
            }
            match host.read_file(&path).await {
                Ok(content) => {
                    let relative = workspace_relative(&roots, &path);
                    let budget = max_results - matches.len();
                    matches.extend(
                        match_lines(&path, &relative, &content, &needle)
                            .take(budget)
                            .map(Arc::new),
                    );
                    if matches.len() >= max_results {
                        break 'roots;
                    }
                }
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable file"),
            }
            tokio::task::yield_now().await;
        }
    }

    if token.is_cancelled() {
        return TextMatches::default();
    }
    tracing::debug!(query = %query, matches = matches.len(), "Text search complete");
    Arc::new(matches)
}

fn match_lines<'a>(
    path: &Path,
    relative: &'a str,
    content: &'a str,
    needle: &'a [char],
) -> impl Iterator<Item = SearchItem> + 'a {
    let uri = file_uri(path);
    content.lines().enumerate().filter_map(move |(line_no, line)| {
        let found = find_ignore_case(line, needle)?;
        let range = Range::on_line(
            u32::try_from(line_no).ok()?,
            u32::try_from(found.column).ok()?,
            u32::try_from(needle.len()).ok()?,
        );
        Some(SearchItem::text_match(
            &uri,
            relative,
            range,
            line,
            &line[found.start..found.end],
        ))
    })
}

#[derive(Debug, PartialEq, Eq)]
struct LineMatch {
    /// Character column of the match.
    column: usize,
    /// Byte span inside the line.
    start: usize,
    end: usize,
}

/// First case-insensitive occurrence of `needle` in `line`.
fn find_ignore_case(line: &str, needle: &[char]) -> Option<LineMatch> {
    if needle.is_empty() {
        return None;
    }
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let last_start = chars.len().checked_sub(needle.len())?;

    (0..=last_start).find_map(|column| {
        let matched = needle
            .iter()
            .zip(&chars[column..])
            .all(|(want, (_, have))| have.to_lowercase().eq(want.to_lowercase()));
        matched.then(|| LineMatch {
            column,
            start: chars[column].0,
            end: chars.get(column + needle.len()).map_or(line.len(), |(b, _)| *b),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::ScriptedHost;
    use crate::model::ItemKind;
    use tokio_test::{assert_pending, assert_ready};

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn matcher(host: &Arc<ScriptedHost>, max: usize) -> TextMatcher {
        TextMatcher::new(Arc::clone(host) as Arc<dyn Host>, ExclusionFilter::default(), max)
    }

    #[test]
    fn test_find_ignore_case() {
        assert_eq!(
            find_ignore_case("let Foo = foo;", &chars("foo")),
            Some(LineMatch { column: 4, start: 4, end: 7 })
        );
        assert_eq!(find_ignore_case("bar", &chars("foo")), None);
        assert_eq!(find_ignore_case("fo", &chars("foo")), None);
        assert_eq!(find_ignore_case("abc", &[]), None);
    }

    #[test]
    fn test_find_maps_back_to_original_bytes() {
        let line = "// ÄÖ café Straße";
        let found = find_ignore_case(line, &chars("CAFÉ")).unwrap();
        assert_eq!(found.column, 6);
        assert_eq!(&line[found.start..found.end], "café");
    }

    #[tokio::test]
    async fn test_one_match_per_line_in_scan_order() {
        let host = Arc::new(ScriptedHost::new());
        host.add_file("a.rs", "fn foo() { foo(); }\nlet x = 1;\n  FOO\n");
        host.add_file("b.rs", "no match\nfoo_bar\n");
        host.add_file("node_modules/dep/index.js", "foo");

        let results = matcher(&host, 200).search("foo").await;
        let found: Vec<(&str, &str)> = results
            .iter()
            .map(|i| (i.label.as_str(), i.description.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("fn foo() { foo(); }", "a.rs:1"),
                ("FOO", "a.rs:3"),
                ("foo_bar", "b.rs:2"),
            ]
        );

        let ItemKind::TextMatch { range, matched, .. } = &results[1].kind else {
            panic!("expected a text match");
        };
        assert_eq!(matched, "FOO");
        assert_eq!(range.start.column, 2);
        assert_eq!(range.end.column, 5);
    }

    #[tokio::test]
    async fn test_result_cap() {
        let host = Arc::new(ScriptedHost::new());
        for i in 0..10 {
            host.add_file(&format!("f{i}.txt"), "foo\nfoo\nfoo\n");
        }
        assert_eq!(matcher(&host, 7).search("foo").await.len(), 7);
    }

    #[tokio::test]
    async fn test_identical_queries_share_one_scan() {
        let host = Arc::new(ScriptedHost::new());
        for i in 0..5 {
            host.add_file(&format!("f{i}.txt"), "foo");
        }
        let matcher = matcher(&host, 200);

        let (a, b) = tokio::join!(matcher.search("foo"), matcher.search("foo"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 5);

        let again = matcher.search(" foo ").await;
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(host.find_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_newer_query_cancels_stale_scan() {
        let host = Arc::new(ScriptedHost::new());
        for i in 0..50 {
            host.add_file(&format!("src/f{i:02}.ts"), "const foo = 1;\nconst bar = 2;\nfoo(bar);\n");
        }
        let matcher = matcher(&host, 500);

        let mut stale = tokio_test::task::spawn(matcher.search("foo"));
        // Scans one file, then yields
        assert_pending!(stale.poll());
        assert_pending!(stale.poll());

        let fresh = tokio_test::block_on(matcher.search("bar"));
        let stale = assert_ready!(stale.poll());

        assert!(stale.is_empty());
        assert_eq!(fresh.len(), 100);
        assert!(fresh.iter().all(|i| i.label.contains("bar")));
        assert_eq!(host.find_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_query_clears() {
        let host = Arc::new(ScriptedHost::new());
        host.add_file("a.txt", "foo");
        let matcher = matcher(&host, 200);

        assert_eq!(matcher.search("foo").await.len(), 1);
        assert!(matcher.search("   ").await.is_empty());
        // Cache is gone, so the same query scans again
        matcher.search("foo").await;
        assert_eq!(host.find_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreadable_file_skipped() {
        let host = Arc::new(ScriptedHost::new());
        host.add_file("a.rs", "foo");
        let locked = host.add_file("b.rs", "foo");
        host.add_file("c.rs", "x\nfoo");
        host.fail_uri(&locked);

        let results = matcher(&host, 200).search("foo").await;
        let found: Vec<&str> = results.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(found, vec!["a.rs:1", "c.rs:2"]);
    }

    #[tokio::test]
    async fn test_configure_applies_exclusions() {
        let host = Arc::new(ScriptedHost::new());
        host.add_file("keep.ts", "foo");
        host.add_file("skip.gen.ts", "foo");
        let matcher = matcher(&host, 200);
        assert_eq!(matcher.search("foo").await.len(), 2);

        matcher.configure(ExclusionFilter::new(&["*.gen.ts".to_string()]), 200);
        let results = matcher.search("foo").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].description, "keep.ts:1");
    }
}
