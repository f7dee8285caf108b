//! Error types shared by the remote HTTP storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`HttpDaoError`] failures.
pub type HttpResult<T> = Result<T, HttpDaoError>;

/// Failures that can occur while talking to the remote API.
#[derive(Debug, Error)]
pub enum HttpDaoError {
    /// The configured base URL cannot be used.
    #[error("invalid remote API URL `{url}`: {reason}")]
    InvalidUrl {
        /// URL as configured.
        url: String,
        /// Parser complaint.
        reason: String,
    },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build remote API client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or no response arrived.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        /// Request path.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The remote answered with a non-success status.
    #[error("remote API answered {status} for `{path}`: {message}")]
    RequestStatus {
        /// Request path.
        path: String,
        /// Status returned.
        status: StatusCode,
        /// Details from the store.
        message: String,
    },
    /// Response payload could not be parsed.
    #[error("failed to decode remote API response for `{path}`")]
    DecodeResponse {
        /// Request path.
        path: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
}

impl From<HttpDaoError> for StorageError {
    fn from(err: HttpDaoError) -> Self {
        match err {
            HttpDaoError::RequestStatus {
                status: StatusCode::CONFLICT,
                ..
            } => StorageError::Conflict {
                message: err.to_string(),
            },
            HttpDaoError::RequestStatus { status, .. } if status.is_client_error() => {
                StorageError::rejected(err.to_string())
            }
            HttpDaoError::DecodeResponse { .. } => StorageError::decode(err.to_string(), err),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
