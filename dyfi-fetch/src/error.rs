//! Error types for dyfi-fetch
//!
//! Fatal kinds (`Config`, `DiscoveryFailed`, session construction) abort the
//! run. Everything else is scoped to one event or one resource and is
//! recorded in the phase report instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connect or read timeout after the retry budget was spent
    #[error("Network timeout: {url}")]
    NetworkTimeout { url: String },

    /// Transport failure (DNS, connect refused, reset, body read)
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Event search failed; nothing downstream can proceed
    #[error("Event discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Detail document malformed or missing expected keys
    #[error("Detail document for {event_id} unusable: {message}")]
    DetailParse { event_id: String, message: String },

    /// Non-success status on a resource URL
    #[error("HTTP {status} for {url}")]
    ResourceFetch { url: String, status: u16 },

    /// Response body was expected to be JSON and is not
    #[error("Invalid JSON from {url}: {message}")]
    InvalidJson { url: String, message: String },

    /// URL has no usable final path segment
    #[error("Cannot derive a file name from {0}")]
    InvalidResourceUrl(String),

    /// Filesystem failure with the offending path
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Summary CSV could not be read or written
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// dyfi-common error (layout, event id validation)
    #[error("Common error: {0}")]
    Common(#[from] dyfi_common::Error),
}

impl FetchError {
    /// Transport-level failures worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::NetworkTimeout { .. } | FetchError::Network { .. })
    }

    /// Classify a reqwest error for `url`
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::NetworkTimeout { url: url.to_string() }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Result type for pipeline operations
pub type FetchResult<T> = Result<T, FetchError>;
