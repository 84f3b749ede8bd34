use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

use super::Partition;

/// Opaque session identifier, allocated by the store at creation.
///
/// Deliberately a string, not a UUID type: the id travels through share
/// links and store paths and its internal shape is nobody's business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One subject's window: who owns it and how they see themselves.
///
/// Sessions are permanent; there is no completion or deletion in the
/// exercise. `self_selections` is replaced wholesale on every submission
/// (never merged), and only the creator may write it. Peer perceptions live
/// in separate [`FeedbackRecord`]s keyed by submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub creator_id: Identity,
    pub display_name: String,
    /// Subset of the vocabulary the subject picked for themselves.
    pub self_selections: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Lifecycle position, derived from the data rather than stored:
    /// a session is `Created` until the first non-empty self-assessment
    /// lands, `SelfAssessed` from then on (re-entrant on edit).
    pub fn state(&self) -> SessionState {
        if self.self_selections.is_empty() {
            SessionState::Created
        } else {
            SessionState::SelfAssessed
        }
    }
}

/// The lifecycle state of a session.
///
/// - `Created`: no self-assessment submitted yet
/// - `SelfAssessed`: the subject has picked at least one descriptor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    SelfAssessed,
}

/// One peer's perception of one session's subject.
///
/// At most one record exists per (session, submitter) pair: resubmission
/// replaces `selections` in place rather than adding a second record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub session_id: SessionId,
    pub submitter_id: Identity,
    /// Subset of the vocabulary this peer picked for the subject.
    pub selections: Vec<String>,
    /// When the most recent submission from this peer landed.
    pub submitted_at: DateTime<Utc>,
}

/// Input for creating a new session. The creator is the calling identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionInput {
    pub display_name: String,
}

/// Input carrying a full replacement selection set, used both for the
/// subject's self-assessment and for peer feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSelectionsInput {
    pub selections: Vec<String>,
}

/// Input for renaming a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameSessionInput {
    pub display_name: String,
}

/// Everything an observer needs to render a window: the session, every
/// feedback record, and the partition recomputed from them.
///
/// Snapshots are always rebuilt from a full read, never patched, so a
/// duplicate or reordered change notification produces a correct snapshot
/// rather than corrupted derived state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub session: Session,
    pub state: SessionState,
    pub feedback: Vec<FeedbackRecord>,
    pub partition: Partition,
}
