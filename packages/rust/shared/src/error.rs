//! Error types for tenderfeed.
//!
//! Library crates use [`TenderFeedError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Row-level problems (bad shape, unparseable dates, a detail page that
//! cannot be scraped) are not errors; they degrade or skip a single row.

use std::path::PathBuf;

/// Top-level error type for all tenderfeed operations.
#[derive(Debug, thiserror::Error)]
pub enum TenderFeedError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the portal.
    #[error("network error: {0}")]
    Network(String),

    /// The upstream listing feed answered with something unusable.
    #[error("feed error: {message}")]
    Feed { message: String },

    /// Queue sink failure for a whole batch.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TenderFeedError>;

impl TenderFeedError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a feed error from any displayable message.
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from the upstream feed boundary.
    pub fn is_feed_failure(&self) -> bool {
        matches!(self, Self::Feed { .. } | Self::Network(_))
    }
}
