use std::{error::Error, time::Duration};
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed to answer.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Details from the store.
        message: String,
        /// Underlying error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered but refused the request.
    #[error("storage rejected request: {message}")]
    Rejected {
        /// Reason given by the store.
        message: String,
    },
    /// A record with the same key already exists.
    #[error("storage conflict: {message}")]
    Conflict {
        /// Reason given by the store.
        message: String,
    },
    /// The backend answered with a payload that could not be decoded.
    #[error("storage returned an undecodable payload: {message}")]
    Decode {
        /// Details from the store.
        message: String,
        /// Underlying error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The call did not complete in time.
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a decode error from a deserialisation failure.
    pub fn decode(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Decode {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a rejection carrying the backend's explanation.
    pub fn rejected(message: impl Into<String>) -> Self {
        StorageError::Rejected {
            message: message.into(),
        }
    }
}
