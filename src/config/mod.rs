//! Configuration management for quicksearch.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - JSON configuration file (lowest priority)
//!
//! Malformed or missing values are always defaulted, never fatal. The file
//! can be watched and reloaded while running.

mod settings;
mod watch;

pub use settings::{
    Config, DebounceConfig, DEFAULT_ACTIVITY_WEIGHT, DEFAULT_MAX_RESULTS,
    DEFAULT_MAX_TEXT_RESULTS, DEFAULT_SCORER,
};
pub use watch::{ConfigWatcher, RELOAD_QUIET_PERIOD};
