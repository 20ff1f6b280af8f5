//! Error taxonomy of the client: store, remote and the engine's union of both.

use stocksync_core::{DomainError, ItemId};

/// Failure of the Local Item Store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("item {0} not found in local store")]
    NotFound(ItemId),
    #[error("local database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt local record: {0}")]
    Corrupt(String),
    #[error("local store unavailable: {0}")]
    Io(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of the Remote Item Source.
///
/// All variants fail a refresh the same way; they only differ in the text
/// surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("session expired or credentials rejected")]
    Unauthorized,
    /// Transport succeeded but the business status code signalled failure.
    #[error("{0}")]
    ServerRejected(String),
    #[error("network error: {0}")]
    TransportFailure(String),
}

impl RemoteError {
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::TransportFailure(cause.to_string())
    }
}

/// Error of a Synchronization Engine operation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Invalid(#[from] DomainError),
}
