//! Error types and Result aliases for quicksearch.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using quicksearch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for quicksearch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Host capability error (symbol index, command registry, workspace enumeration).
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Source provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// A selected item's action failed.
    #[error("action failed: {0}")]
    Action(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the host environment.
#[derive(Error, Debug)]
pub enum HostError {
    /// Workspace enumeration failed.
    #[error("failed to enumerate '{root}': {reason}")]
    Enumeration { root: String, reason: String },

    /// Symbol query failed.
    #[error("symbol query failed: {0}")]
    SymbolQuery(String),

    /// Resource could not be read.
    #[error("failed to read '{path}': {reason}")]
    Read { path: String, reason: String },

    /// Command is not registered.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Resource identity is not a local file.
    #[error("unsupported resource '{0}'")]
    UnsupportedResource(String),
}

/// Source provider errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider could not enumerate its corpus slice.
    #[error("{provider} provider failed: {reason}")]
    Enumeration {
        provider: &'static str,
        reason: String,
    },

    /// A single file could not be processed.
    #[error("failed to process '{path}': {reason}")]
    FileProcessing { path: String, reason: String },
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Invalid exclusion pattern.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an action error.
    pub fn action(msg: impl Into<String>) -> Self {
        Self::Action(msg.into())
    }
}

impl HostError {
    /// Create a read error for a path.
    pub fn read(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests;
