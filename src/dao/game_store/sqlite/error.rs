//! Error types shared by the SQLite storage implementation.

use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`SqliteDaoError`] failures.
pub type SqliteResult<T> = Result<T, SqliteDaoError>;

/// Failures that can occur while interacting with SQLite.
#[derive(Debug, Error)]
pub enum SqliteDaoError {
    /// The database URL could not be parsed.
    #[error("invalid SQLite URL `{url}`")]
    InvalidUrl {
        /// URL as configured.
        url: String,
        /// Underlying error.
        #[source]
        source: sqlx::Error,
    },
    /// Opening the connection pool failed.
    #[error("failed to open SQLite database")]
    Connect {
        /// Underlying error.
        #[source]
        source: sqlx::Error,
    },
    /// Creating the tables failed.
    #[error("failed to create SQLite schema")]
    Schema {
        /// Underlying error.
        #[source]
        source: sqlx::Error,
    },
    /// A statement failed to execute.
    #[error("SQLite query `{operation}` failed")]
    Query {
        /// Query that failed.
        operation: &'static str,
        /// Underlying error.
        #[source]
        source: sqlx::Error,
    },
    /// A JSON column could not be encoded.
    #[error("failed to encode column `{column}`")]
    Encode {
        /// Column being written.
        column: &'static str,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A stored JSON column could not be decoded.
    #[error("failed to decode column `{column}`")]
    DecodeJson {
        /// Column that failed to decode.
        column: &'static str,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A stored timestamp is not valid RFC 3339.
    #[error("failed to parse timestamp column `{column}`")]
    Timestamp {
        /// Column that failed to decode.
        column: &'static str,
        /// Underlying error.
        #[source]
        source: time::error::Parse,
    },
    /// A timestamp could not be formatted for storage.
    #[error("failed to format timestamp")]
    FormatTimestamp {
        /// Underlying error.
        #[source]
        source: time::error::Format,
    },
}

impl SqliteDaoError {
    fn is_unique_violation(&self) -> bool {
        match self {
            SqliteDaoError::Query {
                source: sqlx::Error::Database(db),
                ..
            } => db.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<SqliteDaoError> for StorageError {
    fn from(err: SqliteDaoError) -> Self {
        if err.is_unique_violation() {
            return StorageError::Conflict {
                message: err.to_string(),
            };
        }
        match err {
            SqliteDaoError::DecodeJson { .. } | SqliteDaoError::Timestamp { .. } => {
                StorageError::decode(err.to_string(), err)
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
