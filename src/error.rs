//! Error types for conductor-inventory.
//!
//! Every failure the loader can run into maps onto one of a handful of
//! categories. Only network failures are recoverable: they make the loader
//! fall back to the local cache file. Everything else is surfaced to the
//! caller as is.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for conductor-inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for conductor-inventory.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Required construction options are missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Network Errors
    // ========================================================================
    /// The inventory service could not be reached or answered with a
    /// non-success status.
    #[error("{}", network_message(.url, .status, .message))]
    Network {
        /// Requested URL
        url: String,
        /// HTTP status code, if a response was received
        status: Option<u16>,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Format Errors
    // ========================================================================
    /// The inventory document does not have the expected shape.
    #[error("Invalid inventory document: {0}")]
    Format(String),

    /// The inventory document is not valid JSON.
    #[error("Malformed inventory JSON: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Local Cache Errors
    // ========================================================================
    /// The cache file is missing or unreadable.
    #[error("Failed to read inventory cache '{path}': {source}")]
    LocalCache {
        /// Path to the cache file
        path: PathBuf,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    /// The cache file could not be written.
    #[error("Failed to write inventory cache '{path}': {source}")]
    CacheWrite {
        /// Path to the cache file
        path: PathBuf,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    /// The remote fetch failed and the local cache could not stand in.
    #[error("Inventory unavailable: {remote}; local fallback failed: {local}")]
    Unavailable {
        /// Why the remote fetch failed
        remote: Box<Error>,
        /// Why the local cache could not be used
        local: Box<Error>,
    },
}

fn network_message(url: &str, status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {} while fetching '{}': {}", code, url, message),
        None => format!("Request to '{}' failed: {}", url, message),
    }
}

impl Error {
    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a new format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Creates a network error for a response with an unexpected status.
    pub fn http_status(url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a network error for a transport-level failure.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Returns true if this error should trigger the local cache fallback.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// Returns true if the inventory document itself was at fault.
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_) | Error::Json(_))
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::Network { .. } | Error::Unavailable { .. } => 3,
            Error::Format(_) | Error::Json(_) => 4,
            Error::LocalCache { .. } | Error::CacheWrite { .. } => 5,
        }
    }
}
