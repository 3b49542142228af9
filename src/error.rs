//! Error types for the web application and its ORM layer.
//!
//! All errors flow through [`OrmError`]. Definition-time errors abort model
//! registration, row-count mismatches are recoverable and may be ignored by
//! the caller, and database failures carry the driver's message unchanged.

use crate::config::DEFAULT_ACQUIRE_TIMEOUT_SECS;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrmError {
    #[error("Primary key not found for model '{model}'")]
    MissingPrimaryKey { model: String },

    #[error("Duplicate primary key for model '{model}': field '{field}'")]
    DuplicatePrimaryKey { model: String, field: String },

    #[error("Field '{field}' is declared more than once on model '{model}'")]
    DuplicateField { model: String, field: String },

    #[error("Model '{model}' has no attribute '{attribute}'")]
    AttributeNotFound { model: String, attribute: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Cannot {operation} {model} record: it is not persisted")]
    NotPersisted { model: String, operation: String },

    #[error("Failed to {operation} record in '{table}': affected rows: {actual} (expected {expected})")]
    UnexpectedRowCount {
        operation: String,
        table: String,
        expected: u64,
        actual: u64,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "23000" for an integrity constraint violation
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl OrmError {
    pub fn missing_primary_key(model: impl Into<String>) -> Self {
        Self::MissingPrimaryKey {
            model: model.into(),
        }
    }

    pub fn duplicate_primary_key(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::DuplicatePrimaryKey {
            model: model.into(),
            field: field.into(),
        }
    }

    pub fn duplicate_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::DuplicateField {
            model: model.into(),
            field: field.into(),
        }
    }

    pub fn attribute_not_found(model: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            model: model.into(),
            attribute: attribute.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_persisted(model: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::NotPersisted {
            model: model.into(),
            operation: operation.into(),
        }
    }

    pub fn unexpected_row_count(
        operation: impl Into<String>,
        table: impl Into<String>,
        expected: u64,
        actual: u64,
    ) -> Self {
        Self::UnexpectedRowCount {
            operation: operation.into(),
            table: table.into(),
            expected,
            actual,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Replace the elapsed time reported by a `Timeout`; other errors pass
    /// through unchanged.
    pub fn with_elapsed_secs(self, secs: u32) -> Self {
        match self {
            Self::Timeout { operation, .. } => Self::Timeout {
                operation,
                elapsed_secs: secs,
            },
            other => other,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Errors raised while registering a model schema.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::MissingPrimaryKey { .. }
                | Self::DuplicatePrimaryKey { .. }
                | Self::DuplicateField { .. }
        )
    }

    /// A save/update/remove that reached the database but touched an
    /// unexpected number of rows. Callers may choose to ignore it.
    pub fn is_row_count_mismatch(&self) -> bool {
        matches!(self, Self::UnexpectedRowCount { .. })
    }

    /// Check if this error is retryable. Nothing in this crate retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

/// Convert sqlx errors to OrmError.
impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => OrmError::connection(
                msg.to_string(),
                "Check the connection options and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                OrmError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => OrmError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            // Default pool setting; `Database` substitutes its configured value
            sqlx::Error::PoolTimedOut => OrmError::timeout(
                "connection pool acquire",
                DEFAULT_ACQUIRE_TIMEOUT_SECS as u32,
            ),
            sqlx::Error::PoolClosed => {
                OrmError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => OrmError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => OrmError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => OrmError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => OrmError::database(
                format!("Column not found: {}", col),
                None,
                "Check the model mappings against the table definition",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                OrmError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => OrmError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => OrmError::internal("Database worker crashed"),
            _ => OrmError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for ORM operations.
pub type OrmResult<T> = Result<T, OrmError>;
