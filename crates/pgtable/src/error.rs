//! Error types for pgtable

use crate::operation::Operation;
use thiserror::Error;

/// Result type alias for pgtable operations
pub type QbResult<T> = Result<T, QbError>;

/// Error types for building and executing table queries
#[derive(Debug, Error)]
pub enum QbError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration could not be read or is incomplete
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed identifier, operator or input shape
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The session is not in a state that allows the operation
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Operation name outside the supported set
    #[error("No such operation: {0}")]
    UnknownOperation(String),

    /// A statement failed in the database, with the table and operation that issued it
    #[error("{operation} on table '{table}' failed: {source}")]
    Execution {
        table: String,
        operation: Operation,
        #[source]
        source: Box<QbError>,
    },

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl QbError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Wrap an adapter error with the table and operation that issued the statement.
    pub fn execution(table: impl Into<String>, operation: Operation, source: QbError) -> Self {
        Self::Execution {
            table: table.into(),
            operation,
            source: Box::new(source),
        }
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Check if this is a precondition error
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Check if this is a unique violation, looking through execution context
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::UniqueViolation(_) => true,
            Self::Execution { source, .. } => source.is_unique_violation(),
            _ => false,
        }
    }

    /// The error reported by the database, without execution context.
    pub fn root(&self) -> &QbError {
        match self {
            Self::Execution { source, .. } => source.root(),
            other => other,
        }
    }

    /// Parse a tokio_postgres error into a more specific QbError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for QbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Connection(err.to_string())
    }
}
