//! Error types shared by the CouchDB storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::{RejectionKind, StorageError};

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB rejected a GET against the target database.
    #[error("failed to query CouchDB database `{database}`")]
    DatabaseQuery {
        database: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB rejected a database creation request.
    #[error("failed to create CouchDB database `{database}`")]
    DatabaseCreate {
        database: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB returned an unexpected status code for a database operation.
    #[error("unexpected CouchDB database response status {status} for `{database}`")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    /// A request to a document endpoint could not be sent.
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB returned an unexpected status code for a document endpoint.
    #[error("unexpected CouchDB response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Decoding a JSON value into the expected model failed.
    #[error("failed to deserialize CouchDB value for `{path}`")]
    DeserializeValue {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// The requested document does not exist.
    #[error("CouchDB document `{doc_id}` not found")]
    MissingDocument { doc_id: String },
    /// A set with the same number already exists for the match.
    #[error("set {set_number} already exists for match `{match_id}`")]
    DuplicateSet { match_id: uuid::Uuid, set_number: u32 },
}

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::MissingDocument { .. } => {
                StorageError::rejected(RejectionKind::NotFound, err.to_string())
            }
            CouchDaoError::DuplicateSet { .. } => {
                StorageError::rejected(RejectionKind::Conflict, err.to_string())
            }
            CouchDaoError::RequestStatus { status, .. } => match rejection_kind(status) {
                Some(kind) => StorageError::rejected(kind, err.to_string()),
                None => StorageError::unavailable(err.to_string(), err),
            },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

/// Map client-error statuses to application-level rejections; anything else is transport.
fn rejection_kind(status: StatusCode) -> Option<RejectionKind> {
    match status {
        StatusCode::NOT_FOUND => Some(RejectionKind::NotFound),
        StatusCode::CONFLICT => Some(RejectionKind::Conflict),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(RejectionKind::Forbidden),
        StatusCode::BAD_REQUEST => Some(RejectionKind::Invalid),
        _ => None,
    }
}
