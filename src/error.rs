//! Error types for the Cardano DEX indexer.
//!
//! This module provides a unified error type [`IndexerError`] that encompasses
//! all possible errors that can occur while resolving chain data, classifying
//! DEX transactions, and persisting the results.
//!
//! # Design
//!
//! The error hierarchy is organized by layer:
//! - [`IndexerError::Config`]: configuration and environment issues
//! - [`IndexerError::ChainData`]: chain-data provider and network errors
//! - [`IndexerError::Decoding`]: datum decoding and parsing errors
//! - [`IndexerError::Cache`]: UTXO cache mutation errors (always swallowed by callers)
//! - [`IndexerError::Database`]: persistence layer errors
//! - [`IndexerError::Rollback`]: failures while re-initializing after a rollback
//! - [`IndexerError::Fatal`]: unrecoverable startup failures
//!
//! All errors implement [`std::error::Error`] and include rich context via
//! the source error chain.
//!
//! # Example
//!
//! ```
//! use cardano_dex_indexer::error::IndexerError;
//!
//! fn validate_reserve(reserve: i128) -> Result<(), IndexerError> {
//!     if reserve < 0 {
//!         return Err(IndexerError::data("reserve cannot be negative", None));
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

/// Result type alias using [`IndexerError`].
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Unified error type for the indexer.
///
/// This enum encompasses all error types that can occur during:
/// - Configuration loading
/// - Chain-data resolution (cache + fallback)
/// - DEX datum decoding
/// - Persistence
/// - Rollback handling
#[derive(Debug)]
pub enum IndexerError {
    /// Configuration or environment variable errors.
    Config {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Chain-data provider or network errors (spec §7 "transient network error").
    ///
    /// Surfaced once retries are exhausted. Fatal for the block's swaps, but
    /// never fatal for the process itself.
    ChainData {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Datum / transaction decoding errors (spec §4.3 "malformed datum").
    Decoding {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Data errors: unresolvable asset/tx reference (spec §7 "data error").
    ///
    /// Logged and dropped by the caller; never propagated past the
    /// classifier or swap-processor boundary.
    Data {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// UTXO cache mutation errors.
    ///
    /// Always caught and treated as a cache miss by the caller (spec §4.1
    /// "Cache mutation errors are logged and swallowed").
    Cache {
        /// Human-readable error message
        message: String,
    },

    /// Persistence layer errors (spec §7 "persistence failure").
    Database {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rollback re-initialization failures.
    Rollback {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unrecoverable startup failures (spec §7 "Fatal").
    ///
    /// Upstream sync connection lost beyond retry, database unreachable at
    /// startup, invalid configuration.
    Fatal {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl IndexerError {
    /// Create a new configuration error.
    #[must_use]
    pub fn config(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source,
        }
    }

    /// Create a new chain-data provider error.
    #[must_use]
    pub fn chain_data(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ChainData {
            message: message.into(),
            source,
        }
    }

    /// Create a new decoding error.
    #[must_use]
    pub fn decoding(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Decoding {
            message: message.into(),
            source,
        }
    }

    /// Create a new data error.
    #[must_use]
    pub fn data(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Data {
            message: message.into(),
            source,
        }
    }

    /// Create a new cache error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new database error.
    #[must_use]
    pub fn database(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source,
        }
    }

    /// Create a new rollback error.
    #[must_use]
    pub fn rollback(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Rollback {
            message: message.into(),
            source,
        }
    }

    /// Create a new fatal error.
    #[must_use]
    pub fn fatal(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Fatal {
            message: message.into(),
            source,
        }
    }

    /// Whether this error represents a fatal, unrecoverable condition.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

impl fmt::Display for IndexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, .. } => write!(f, "configuration error: {message}"),
            Self::ChainData { message, .. } => write!(f, "chain data error: {message}"),
            Self::Decoding { message, .. } => write!(f, "decoding error: {message}"),
            Self::Data { message, .. } => write!(f, "data error: {message}"),
            Self::Cache { message } => write!(f, "cache error: {message}"),
            Self::Database { message, .. } => write!(f, "database error: {message}"),
            Self::Rollback { message, .. } => write!(f, "rollback error: {message}"),
            Self::Fatal { message, .. } => write!(f, "fatal error: {message}"),
        }
    }
}

impl std::error::Error for IndexerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config { source, .. }
            | Self::ChainData { source, .. }
            | Self::Decoding { source, .. }
            | Self::Data { source, .. }
            | Self::Database { source, .. }
            | Self::Rollback { source, .. }
            | Self::Fatal { source, .. } => {
                source.as_ref().map(|e| e.as_ref() as &dyn std::error::Error)
            }
            Self::Cache { .. } => None,
        }
    }
}

/// Convert from `eyre::Report` to `IndexerError`.
///
/// Used at CLI bootstrap boundaries that still report errors via `eyre`.
/// Uncategorized failures default to [`IndexerError::Fatal`] since anything
/// reaching `main` via `eyre` at startup has already exhausted its own
/// recovery path.
impl From<eyre::Report> for IndexerError {
    fn from(err: eyre::Report) -> Self {
        Self::Fatal {
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<sqlx::Error> for IndexerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_displays_message() {
        let err = IndexerError::config("DATABASE_URL not set", None);
        assert!(matches!(err, IndexerError::Config { .. }));
        assert_eq!(err.to_string(), "configuration error: DATABASE_URL not set");
    }

    #[test]
    fn chain_data_error_displays_message() {
        let err = IndexerError::chain_data("fallback timed out", None);
        assert_eq!(err.to_string(), "chain data error: fallback timed out");
    }

    #[test]
    fn decoding_error_displays_message() {
        let err = IndexerError::decoding("unexpected constructor tag", None);
        assert_eq!(err.to_string(), "decoding error: unexpected constructor tag");
    }

    #[test]
    fn cache_error_has_no_source() {
        let err = IndexerError::cache("poisoned mutex");
        assert!(err.source().is_none());
    }

    #[test]
    fn database_error_chains_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = IndexerError::database("failed to persist prices", Some(Box::new(source)));
        assert!(err.source().is_some());
    }

    #[test]
    fn fatal_error_is_fatal() {
        let err = IndexerError::fatal("database unreachable at startup", None);
        assert!(err.is_fatal());
        assert!(!IndexerError::config("x", None).is_fatal());
    }
}
