//! Configuration settings, lenient loading and validation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::watcher::ExclusionFilter;
use crate::{Error, Result};

/// Default maximum number of results returned by a search.
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Default cap on text matches collected per query.
pub const DEFAULT_MAX_TEXT_RESULTS: usize = 200;

/// Default multiplier applied to the recency factor.
pub const DEFAULT_ACTIVITY_WEIGHT: f64 = 0.5;

/// Default fuzzy scorer name.
pub const DEFAULT_SCORER: &str = "nucleo";

/// Debounce windows, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebounceConfig {
    /// Quiet period before recording editor activity.
    pub activity_ms: u64,
    /// Quiet period before a provider re-enumerates its slice.
    pub provider_ms: u64,
    /// Quiet period before the aggregate re-reads provider snapshots.
    pub index_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            activity_ms: 500,
            provider_ms: 2000,
            index_ms: 3500,
        }
    }
}

impl DebounceConfig {
    #[must_use]
    pub const fn activity(&self) -> Duration {
        Duration::from_millis(self.activity_ms)
    }

    #[must_use]
    pub const fn provider(&self) -> Duration {
        Duration::from_millis(self.provider_ms)
    }

    #[must_use]
    pub const fn index(&self) -> Duration {
        Duration::from_millis(self.index_ms)
    }
}

/// Main configuration for the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Index workspace files.
    pub include_files: bool,

    /// Index host commands.
    pub include_commands: bool,

    /// Index workspace and document symbols.
    pub include_symbols: bool,

    /// Run on-demand text matching for non-empty queries.
    pub include_text: bool,

    /// Record editor activity and boost recently used resources.
    pub activity_tracking: bool,

    /// Weight of the recency boost.
    pub activity_weight: f64,

    /// Maximum number of results per search.
    pub max_results: usize,

    /// Maximum number of text matches collected per query.
    pub max_text_results: usize,

    /// User exclusion patterns, appended to the defaults.
    pub exclude: Vec<String>,

    /// Fuzzy scorer implementation name.
    pub fuzzy_search: String,

    /// Show line previews for text matches.
    pub preview: bool,

    /// Verbose diagnostics.
    pub debug: bool,

    /// Debounce windows.
    pub debounce: DebounceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_files: true,
            include_commands: true,
            include_symbols: true,
            include_text: true,
            activity_tracking: true,
            activity_weight: DEFAULT_ACTIVITY_WEIGHT,
            max_results: DEFAULT_MAX_RESULTS,
            max_text_results: DEFAULT_MAX_TEXT_RESULTS,
            exclude: Vec::new(),
            fuzzy_search: DEFAULT_SCORER.to_string(),
            preview: true,
            debug: false,
            debounce: DebounceConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file.
    ///
    /// Never fails: a missing, unreadable or malformed file yields defaults,
    /// and each malformed field falls back to its default individually.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Config unreadable, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Config is not valid JSON, using defaults");
                Self::default()
            }
        }
    }

    /// Build a configuration from a JSON value, defaulting field by field.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(obj) = value.as_object() else {
            tracing::warn!("Config root is not an object, using defaults");
            return defaults;
        };

        let debounce = obj.get("debounce").and_then(Value::as_object);
        let debounce_ms = |key: &str, default: u64| {
            debounce
                .and_then(|d| d.get(key))
                .map_or(default, |v| read_or(key, v.as_u64(), default))
        };

        Self {
            include_files: field(obj, "includeFiles", Value::as_bool, defaults.include_files),
            include_commands: field(obj, "includeCommands", Value::as_bool, defaults.include_commands),
            include_symbols: field(obj, "includeSymbols", Value::as_bool, defaults.include_symbols),
            include_text: field(obj, "includeText", Value::as_bool, defaults.include_text),
            activity_tracking: field(obj, "activityTracking", Value::as_bool, defaults.activity_tracking),
            activity_weight: field(obj, "activityWeight", Value::as_f64, defaults.activity_weight),
            max_results: field(obj, "maxResults", as_usize, defaults.max_results),
            max_text_results: field(obj, "maxTextResults", as_usize, defaults.max_text_results),
            exclude: field(obj, "exclude", as_string_list, defaults.exclude),
            fuzzy_search: field(
                obj,
                "fuzzySearch",
                |v| v.as_str().map(str::to_string),
                defaults.fuzzy_search,
            ),
            preview: field(obj, "preview", Value::as_bool, defaults.preview),
            debug: field(obj, "debug", Value::as_bool, defaults.debug),
            debounce: DebounceConfig {
                activity_ms: debounce_ms("activityMs", defaults.debounce.activity_ms),
                provider_ms: debounce_ms("providerMs", defaults.debounce.provider_ms),
                index_ms: debounce_ms("indexMs", defaults.debounce.index_ms),
            },
        }
        .sanitized()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is out of range.
    pub fn validate(&self) -> Result<()> {
        if !self.activity_weight.is_finite() || self.activity_weight < 0.0 {
            return Err(Error::config(format!(
                "activity weight must be a non-negative number, got {}",
                self.activity_weight
            )));
        }

        if self.max_results == 0 {
            return Err(Error::config("max_results cannot be 0"));
        }

        if self.max_text_results == 0 {
            return Err(Error::config("max_text_results cannot be 0"));
        }

        if self.exclude.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::config("exclude patterns cannot be empty"));
        }
        ExclusionFilter::strict(&self.exclude)?;

        Ok(())
    }

    /// Clamp out-of-range values back to usable defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if !self.activity_weight.is_finite() || self.activity_weight < 0.0 {
            tracing::warn!(weight = self.activity_weight, "Invalid activity weight, using default");
            self.activity_weight = DEFAULT_ACTIVITY_WEIGHT;
        }
        if self.max_results == 0 {
            self.max_results = DEFAULT_MAX_RESULTS;
        }
        if self.max_text_results == 0 {
            self.max_text_results = DEFAULT_MAX_TEXT_RESULTS;
        }
        self.exclude.retain(|p| !p.trim().is_empty());
        self
    }

    /// Whether the indexed slice set differs from another configuration.
    #[must_use]
    pub fn slices_differ(&self, other: &Self) -> bool {
        self.include_files != other.include_files
            || self.include_commands != other.include_commands
            || self.include_symbols != other.include_symbols
            || self.exclude != other.exclude
    }
}

fn field<T>(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    read: impl Fn(&Value) -> Option<T>,
    default: T,
) -> T {
    match obj.get(key) {
        None | Some(Value::Null) => default,
        Some(v) => read_or(key, read(v), default),
    }
}

fn read_or<T>(key: &str, value: Option<T>, default: T) -> T {
    value.unwrap_or_else(|| {
        tracing::warn!(key, "Malformed config value, using default");
        default
    })
}

fn as_usize(value: &Value) -> Option<usize> {
    value.as_u64().and_then(|n| usize::try_from(n).ok())
}

fn as_string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
