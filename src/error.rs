use thiserror::Error;

use crate::models::SessionId;
use crate::store::StoreError;

/// Everything a session operation can fail with.
///
/// Validation errors (`InvalidSelection`, `SelectionLimitExceeded`) are
/// raised before any write, so a rejected submission never leaves partial
/// state behind. `StoreUnavailable` wraps any adapter failure; the
/// operation was not applied and the caller decides whether to retry.
#[derive(Debug, Error)]
pub enum JohariError {
    /// A submitted descriptor is not part of the active vocabulary.
    #[error("\"{0}\" is not in the vocabulary")]
    InvalidSelection(String),

    /// More descriptors were submitted than the configured cap allows.
    #[error("at most {limit} descriptors may be selected, got {attempted}")]
    SelectionLimitExceeded { limit: usize, attempted: usize },

    /// No session exists under the given id.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The store adapter failed the operation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}
