use std::{error::Error, fmt};
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Application-level reason a backend refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    NotFound,
    Conflict,
    Forbidden,
    Invalid,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RejectionKind::NotFound => "not found",
            RejectionKind::Conflict => "conflict",
            RejectionKind::Forbidden => "forbidden",
            RejectionKind::Invalid => "invalid",
        };
        f.write_str(label)
    }
}

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transport-level failure (network, timeout, backend down).
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered but refused the request.
    #[error("storage rejected request ({kind}): {message}")]
    Rejected { kind: RejectionKind, message: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct an application-level rejection.
    pub fn rejected(kind: RejectionKind, message: impl Into<String>) -> Self {
        StorageError::Rejected {
            kind,
            message: message.into(),
        }
    }

    /// Whether the backend refused the write because the record already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorageError::Rejected {
                kind: RejectionKind::Conflict,
                ..
            }
        )
    }
}
