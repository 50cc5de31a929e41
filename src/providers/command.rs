//! Command provider: user-facing entries of the host's command registry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{ProviderKind, ProviderState, Snapshot};
use crate::host::Host;
use crate::model::SearchItem;
use crate::Result;

/// Identifier prefixes reserved for internal commands.
const INTERNAL_PREFIXES: &[&str] = &["_", "internal.", "workbench.internal.", "setContext"];

/// Whether a command id is internal and hidden from search.
#[must_use]
pub fn is_internal_command(id: &str) -> bool {
    id.is_empty() || id.contains(':') || INTERNAL_PREFIXES.iter().any(|p| id.starts_with(p))
}

/// Human-readable label for a command id.
///
/// The last dotted segment is split on camelCase, kebab-case and snake_case
/// boundaries and each word is capitalized: `editor.action.formatDocument`
/// becomes `Format Document`.
#[must_use]
pub fn command_label(id: &str) -> String {
    let segment = id.rsplit('.').find(|s| !s.is_empty()).unwrap_or(id);

    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;
    for c in segment.chars() {
        if c == '-' || c == '_' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }
        let boundary = prev.is_some_and(|p| {
            (p.is_lowercase() || p.is_ascii_digit()) && c.is_uppercase()
        });
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev = Some(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lists registered commands.
///
/// The registry is cheap to read, so every request re-enumerates it.
pub struct CommandProvider {
    host: Arc<dyn Host>,
    state: ProviderState,
}

impl fmt::Debug for CommandProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandProvider")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CommandProvider {
    #[must_use]
    pub fn new(host: Arc<dyn Host>, window: Duration) -> Self {
        Self {
            host,
            state: ProviderState::new(ProviderKind::Commands, window),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ProviderState {
        &self.state
    }

    /// Fresh enumeration of the registry.
    pub async fn get_items(&self) -> Snapshot {
        self.refresh(true).await;
        self.state.snapshot()
    }

    pub async fn refresh(&self, force: bool) {
        self.state.refresh_with(force, || self.enumerate()).await;
    }

    async fn enumerate(&self) -> Result<Vec<Arc<SearchItem>>> {
        let ids = self.host.commands().await?;
        Ok(ids
            .iter()
            .filter(|id| !is_internal_command(id))
            .map(|id| Arc::new(SearchItem::command(id, command_label(id))))
            .collect())
    }
}
