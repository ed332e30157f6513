//! Error types for the message store.
//!
//! Uses `thiserror` for ergonomic error handling with typed variants that
//! can be inspected by callers. Storage failures are surfaced
//! uninterpreted except for a single translation step mapping the
//! substrate's "no rows" signal to the semantic not-found variant.

use super::domain::MessageId;
use std::sync::Arc;
use thiserror::Error;

/// Invalid-argument errors rejected at the service boundary before any
/// transaction is opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required identifier was the nil UUID.
    #[error("{field} must not be the nil id")]
    NilId {
        /// Which argument was nil.
        field: &'static str,
    },

    /// The message text was empty.
    #[error("message text must not be empty")]
    EmptyText,

    /// A stamp delta outside the accepted range was supplied.
    #[error("stamp delta must be at least 1, got {0}")]
    InvalidStampDelta(i64),
}

impl ValidationError {
    /// Creates a nil-identifier error for the named argument.
    #[must_use]
    pub const fn nil_id(field: &'static str) -> Self {
        Self::NilId { field }
    }
}

/// Errors that can occur during persistence operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The referenced message is absent or soft-deleted.
    #[error("message not found: {0}")]
    NotFound(MessageId),

    /// Reserved for future use; current upserts avoid surfacing
    /// conflicts.
    #[error("conflicting write")]
    Conflict,

    /// A database error occurred during read, write, or commit.
    #[error("database error: {0}")]
    Database(Arc<dyn std::error::Error + Send + Sync>),

    /// A connection could not be obtained or a worker task failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// A row could not be converted to or from its domain type.
    #[error("serialisation error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    /// Creates a database error from any error type.
    #[must_use]
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Database(Arc::new(err))
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a serialisation error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Translates a Diesel error into the repository taxonomy, mapping
    /// the substrate's "no rows" signal for `message_id` to the semantic
    /// [`RepositoryError::NotFound`].
    #[must_use]
    pub fn from_diesel(err: diesel::result::Error, message_id: MessageId) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::NotFound(message_id),
            other => Self::database(other),
        }
    }
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        // Context-free conversion cannot name the missing row; paths that
        // can, use `from_diesel` with the message id instead.
        Self::database(err)
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors surfaced by the message service.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An argument was rejected at the boundary.
    #[error(transparent)]
    InvalidArgument(#[from] ValidationError),

    /// A persistence operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl StoreError {
    /// Returns `true` if the error is the semantic not-found condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Repository(RepositoryError::NotFound(_)))
    }
}

/// Result type for service operations.
pub type StoreResult<T> = Result<T, StoreError>;
