//! File provider: every non-excluded file under the workspace roots.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::{ProviderKind, ProviderState};
use crate::error::ProviderError;
use crate::host::{workspace_relative, Host};
use crate::model::SearchItem;
use crate::scheduler::{yield_between_batches, DEFAULT_BATCH_SIZE};
use crate::watcher::{ExclusionFilter, WorkspaceEvent};
use crate::Result;

/// Icon hint per file extension.
const FILE_ICONS: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("jsx", "react"),
    ("ts", "typescript"),
    ("tsx", "react"),
    ("go", "go"),
    ("java", "java"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("rb", "ruby"),
    ("php", "php"),
    ("swift", "swift"),
    ("kt", "kotlin"),
    ("scala", "scala"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("sql", "database"),
    ("md", "markdown"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("json", "json"),
    ("toml", "settings"),
    ("xml", "xml"),
    ("html", "html"),
    ("css", "css"),
    ("scss", "css"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("png", "image"),
    ("jpg", "image"),
    ("svg", "image"),
];

/// Icon used when the extension has no entry.
const DEFAULT_ICON: &str = "file";

/// Icon hint for a path, keyed by extension.
#[must_use]
pub fn icon_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|ext| {
            let ext = ext.to_lowercase();
            FILE_ICONS.iter().find(|(e, _)| *e == ext).map(|(_, icon)| *icon)
        })
        .unwrap_or(DEFAULT_ICON)
}

/// Lists files under every workspace root.
pub struct FileProvider {
    host: Arc<dyn Host>,
    filter: ExclusionFilter,
    state: ProviderState,
}

impl fmt::Debug for FileProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileProvider")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl FileProvider {
    #[must_use]
    pub fn new(host: Arc<dyn Host>, filter: ExclusionFilter, window: Duration) -> Self {
        Self {
            host,
            filter,
            state: ProviderState::new(ProviderKind::Files, window),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ProviderState {
        &self.state
    }

    /// Re-enumerate every root.
    pub async fn refresh(&self, force: bool) {
        self.state.refresh_with(force, || self.enumerate()).await;
    }

    async fn enumerate(&self) -> Result<Vec<Arc<SearchItem>>> {
        let roots = self.host.workspace_roots();
        let filter = self.filter.clone().with_roots(roots.iter().cloned());
        let mut items = Vec::new();
        let mut failures = 0usize;

        for root in &roots {
            let files = match self.host.find_files(root, &filter).await {
                Ok(files) => files,
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "Skipping workspace root");
                    failures += 1;
                    continue;
                }
            };

            for (processed, path) in files.iter().enumerate() {
                if !filter.should_exclude(path) {
                    let relative = workspace_relative(&roots, path);
                    items.push(Arc::new(SearchItem::file(path, &relative, icon_for(path))));
                }
                yield_between_batches(processed + 1, DEFAULT_BATCH_SIZE).await;
            }
        }

        if failures > 0 && failures == roots.len() {
            return Err(ProviderError::Enumeration {
                provider: ProviderKind::Files.as_str(),
                reason: "no workspace root could be enumerated".to_string(),
            }
            .into());
        }
        Ok(items)
    }

    /// Schedule a refresh when the set of files changes.
    pub fn handle_event(this: &Arc<Self>, event: &WorkspaceEvent) {
        if !event.changes_file_set() {
            return;
        }
        let provider = Arc::clone(this);
        this.state.debouncer().schedule(async move {
            provider.refresh(false).await;
        });
    }
}
