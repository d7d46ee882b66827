//! Error types for sqlstore.
//!
//! This module defines all error types using `thiserror`. Initialization
//! failures (setup/test) are fatal and propagate to the caller of
//! [`StorageManager::initialize`](crate::StorageManager::initialize);
//! synchronous statement failures propagate to the caller; asynchronous
//! query failures are delivered to the query callback, and asynchronous
//! statement failures without a callback are logged - never swallowed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// An operation requiring a connection ran before `setup()`.
    #[error("driver not initialized: call setup() before {operation}")]
    NotInitialized { operation: String },

    #[error("connection failed: {message}")]
    Connectivity { message: String, suggestion: String },

    #[error("statement failed: {message}")]
    Statement {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl StorageError {
    /// Create a not-initialized error naming the rejected operation.
    pub fn not_initialized(operation: impl Into<String>) -> Self {
        Self::NotInitialized {
            operation: operation.into(),
        }
    }

    /// Create a connectivity error with a helpful suggestion.
    pub fn connectivity(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a statement error with optional SQL state.
    pub fn statement(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Statement {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connectivity { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

/// Convert sqlx errors into the storage taxonomy.
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => StorageError::connectivity(
                msg.to_string(),
                "Check the connection settings and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                StorageError::statement(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => {
                StorageError::statement("No rows returned", None)
            }
            sqlx::Error::PoolTimedOut => StorageError::connectivity(
                "Timed out acquiring a connection from the pool",
                "Raise acquire_timeout or max_connections in the properties",
            ),
            sqlx::Error::PoolClosed => StorageError::connectivity(
                "Connection pool is closed",
                "Reconnect to the database",
            ),
            sqlx::Error::Io(io_err) => StorageError::connectivity(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => StorageError::connectivity(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => StorageError::connectivity(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                StorageError::statement(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => StorageError::internal(
                format!("Column index {} out of bounds (len: {})", index, len),
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                StorageError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                StorageError::internal(format!("Decode error: {}", source))
            }
            sqlx::Error::WorkerCrashed => StorageError::internal("Database worker crashed"),
            _ => StorageError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
