//! quicksearch
//!
//! Low-latency fuzzy search over the files, commands, symbols and raw text of
//! a live workspace. Source providers keep snapshots of their corpus slice,
//! the search service merges them into a deduplicated aggregate and ranks it
//! per query with a pluggable fuzzy scorer, a recency boost and a priority
//! tie-break.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod host;
pub mod model;
pub mod providers;
pub mod scheduler;
pub mod search;
pub mod telemetry;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
pub use host::{Host, LocalHost};
pub use model::{ItemAction, ItemType, RankedItem, SearchItem};
pub use search::{IndexStats, SearchService, ServiceStats};
pub use watcher::WorkspaceEvent;
