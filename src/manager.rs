//! Session lifecycle and window assembly on top of the document store.
//!
//! The manager owns no state of its own. Every read loads fresh documents
//! and every window is recomputed from them, so concurrent writers never
//! leave a subscriber holding a partially updated view.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::JohariError;
use crate::identity::Identity;
use crate::models::{
    CreateSessionInput, FeedbackRecord, RenameSessionInput, Session, SessionId,
    SubmitSelectionsInput, Vocabulary, WindowSnapshot,
};
use crate::store::{DocumentStore, StoreError, Subscription};

const SESSIONS: &str = "sessions";

fn session_path(id: &SessionId) -> String {
    format!("{SESSIONS}/{id}")
}

fn feedback_collection(id: &SessionId) -> String {
    format!("{SESSIONS}/{id}/feedback")
}

fn feedback_path(id: &SessionId, submitter: &Identity) -> String {
    format!(
        "{SESSIONS}/{id}/feedback/{}",
        encode_segment(submitter.as_str())
    )
}

/// Escape an identity so it always forms a single path segment. Identities
/// are opaque and may contain `/`, which would otherwise nest the record
/// under a collection the feedback queries never reach. `%` is escaped
/// first so decoding is unambiguous.
fn encode_segment(raw: &str) -> String {
    raw.replace('%', "%25").replace('/', "%2F")
}

fn decode_segment(raw: &str) -> String {
    raw.replace("%2F", "/").replace("%25", "%")
}

/// Cap on how many descriptors one submission may select.
///
/// The default is uncapped; deployments that want the classic short-list
/// exercise set a limit via [`SelectionPolicy::from_env`] or
/// [`SelectionPolicy::capped`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionPolicy {
    max_selections: Option<usize>,
}

impl SelectionPolicy {
    pub fn uncapped() -> Self {
        Self {
            max_selections: None,
        }
    }

    pub fn capped(limit: usize) -> Self {
        Self {
            max_selections: Some(limit),
        }
    }

    /// Read `JOHARI_MAX_SELECTIONS`; unset or unparsable means uncapped.
    pub fn from_env() -> Self {
        match std::env::var("JOHARI_MAX_SELECTIONS") {
            Ok(raw) => match raw.parse() {
                Ok(limit) => Self::capped(limit),
                Err(_) => {
                    tracing::warn!("Ignoring invalid JOHARI_MAX_SELECTIONS value {raw:?}");
                    Self::uncapped()
                }
            },
            Err(_) => Self::uncapped(),
        }
    }

    pub fn max_selections(&self) -> Option<usize> {
        self.max_selections
    }
}

/// Stored shape of a session document. The id lives in the path, not the
/// payload.
#[derive(Debug, Serialize, Deserialize)]
struct SessionDoc {
    creator_id: Identity,
    display_name: String,
    self_selections: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionDoc {
    fn into_session(self, id: SessionId) -> Session {
        Session {
            id,
            creator_id: self.creator_id,
            display_name: self.display_name,
            self_selections: self.self_selections,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Stored shape of one submitter's feedback. The session id and submitter
/// both live in the path.
#[derive(Debug, Serialize, Deserialize)]
struct FeedbackDoc {
    selections: Vec<String>,
    submitted_at: DateTime<Utc>,
}

fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

fn decode<T: DeserializeOwned>(path: &str, data: Value) -> Result<T, StoreError> {
    serde_json::from_value(data).map_err(|source| StoreError::Malformed {
        path: path.to_string(),
        source,
    })
}

fn dedupe(selections: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    selections
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

/// Coordinates sessions, feedback, and live window delivery.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn DocumentStore>,
    vocabulary: Arc<Vocabulary>,
    policy: SelectionPolicy,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        vocabulary: Vocabulary,
        policy: SelectionPolicy,
    ) -> Self {
        Self {
            store,
            vocabulary: Arc::new(vocabulary),
            policy,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn create_session(
        &self,
        creator: Identity,
        input: CreateSessionInput,
    ) -> Result<Session, JohariError> {
        let now = Utc::now();
        let doc = SessionDoc {
            creator_id: creator,
            display_name: input.display_name,
            self_selections: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let id = SessionId::from(self.store.create(SESSIONS, encode(&doc)?)?);
        tracing::info!("Created session {id} for {}", doc.creator_id);
        Ok(doc.into_session(id))
    }

    pub fn session(&self, id: &SessionId) -> Result<Session, JohariError> {
        Ok(self.load_session_doc(id)?.into_session(id.clone()))
    }

    /// Replace the session owner's self-selected descriptors.
    pub fn submit_self_assessment(
        &self,
        id: &SessionId,
        input: SubmitSelectionsInput,
    ) -> Result<Session, JohariError> {
        let mut doc = self.load_session_doc(id)?;
        doc.self_selections = self.validate_selections(input.selections)?;
        doc.updated_at = Utc::now();

        self.store.set_full(&session_path(id), encode(&doc)?)?;
        tracing::debug!(
            "Session {id} self-assessment updated ({} descriptors)",
            doc.self_selections.len()
        );
        Ok(doc.into_session(id.clone()))
    }

    pub fn rename_session(
        &self,
        id: &SessionId,
        input: RenameSessionInput,
    ) -> Result<Session, JohariError> {
        let mut doc = self.load_session_doc(id)?;
        doc.display_name = input.display_name;
        doc.updated_at = Utc::now();

        self.store.set_full(&session_path(id), encode(&doc)?)?;
        Ok(doc.into_session(id.clone()))
    }

    /// Record one submitter's feedback for a session, replacing any earlier
    /// submission by the same submitter. The write is a whole-document
    /// upsert at a path derived from the submitter, so two concurrent
    /// submissions can never produce duplicate records.
    pub fn submit_peer_feedback(
        &self,
        id: &SessionId,
        submitter: Identity,
        input: SubmitSelectionsInput,
    ) -> Result<FeedbackRecord, JohariError> {
        // Verify the session exists before accepting feedback for it.
        self.load_session_doc(id)?;

        let doc = FeedbackDoc {
            selections: self.validate_selections(input.selections)?,
            submitted_at: Utc::now(),
        };
        self.store
            .set_full(&feedback_path(id, &submitter), encode(&doc)?)?;
        tracing::debug!("Session {id} received feedback from {submitter}");

        Ok(FeedbackRecord {
            session_id: id.clone(),
            submitter_id: submitter,
            selections: doc.selections,
            submitted_at: doc.submitted_at,
        })
    }

    /// All feedback submitted for a session, one record per submitter.
    pub fn feedback_records(&self, id: &SessionId) -> Result<Vec<FeedbackRecord>, JohariError> {
        self.load_session_doc(id)?;
        self.load_feedback(id)
    }

    /// Compute the current four-quadrant window for a session.
    pub fn window(&self, id: &SessionId) -> Result<WindowSnapshot, JohariError> {
        let session = self.session(id)?;
        let feedback = self.load_feedback(id)?;
        Ok(self.assemble_window(session, feedback))
    }

    /// Deliver the current window, then a freshly recomputed window after
    /// every change to the session or its feedback, until the returned
    /// handle is cancelled or dropped.
    ///
    /// The store watch is registered before the first read and all
    /// snapshots flow through a single delivery task, so a write racing
    /// the registration is delivered twice rather than never, and a newer
    /// snapshot is never followed by an older one. Each delivery
    /// recomputes from a full read.
    pub fn subscribe<F>(&self, id: &SessionId, callback: F) -> Result<Subscription, JohariError>
    where
        F: Fn(WindowSnapshot) + Send + Sync + 'static,
    {
        // Fail fast on unknown sessions; everything past this point runs
        // on the delivery task.
        self.load_session_doc(id)?;

        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
        let watch = self.store.subscribe(
            &session_path(id),
            Box::new(move |_path| {
                let _ = notify_tx.send(());
            }),
        );

        let manager = self.clone();
        let session_id = id.clone();
        let task = tokio::spawn(async move {
            // The watch lives as long as this task; aborting the task
            // releases it.
            let _watch = watch;
            manager.deliver_window(&session_id, &callback);
            while notify_rx.recv().await.is_some() {
                manager.deliver_window(&session_id, &callback);
            }
        });

        Ok(Subscription::new(task))
    }

    fn deliver_window(&self, id: &SessionId, callback: &dyn Fn(WindowSnapshot)) {
        match self.window(id) {
            Ok(window) => callback(window),
            Err(err) => {
                tracing::warn!("Could not rebuild window for session {id}: {err}");
            }
        }
    }

    fn load_session_doc(&self, id: &SessionId) -> Result<SessionDoc, JohariError> {
        let path = session_path(id);
        match self.store.get(&path)? {
            Some(data) => Ok(decode(&path, data)?),
            None => Err(JohariError::SessionNotFound(id.clone())),
        }
    }

    fn load_feedback(&self, id: &SessionId) -> Result<Vec<FeedbackRecord>, JohariError> {
        let collection = feedback_collection(id);
        let docs = self.store.query(&collection)?;

        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            let path = format!("{collection}/{}", doc.id);
            let feedback: FeedbackDoc = decode(&path, doc.data)?;
            records.push(FeedbackRecord {
                session_id: id.clone(),
                submitter_id: Identity::from(decode_segment(&doc.id)),
                selections: feedback.selections,
                submitted_at: feedback.submitted_at,
            });
        }
        Ok(records)
    }

    fn assemble_window(&self, session: Session, feedback: Vec<FeedbackRecord>) -> WindowSnapshot {
        let peer_selections: Vec<String> = feedback
            .iter()
            .flat_map(|record| record.selections.iter().cloned())
            .collect();
        let partition = self
            .vocabulary
            .partition(&session.self_selections, &peer_selections);

        WindowSnapshot {
            state: session.state(),
            partition,
            feedback,
            session,
        }
    }

    /// Drop duplicates, then reject unknown descriptors and oversized
    /// submissions. Order of the surviving descriptors follows the input.
    fn validate_selections(&self, selections: Vec<String>) -> Result<Vec<String>, JohariError> {
        let selections = dedupe(selections);

        for term in &selections {
            if !self.vocabulary.contains(term) {
                return Err(JohariError::InvalidSelection(term.clone()));
            }
        }

        if let Some(limit) = self.policy.max_selections() {
            if selections.len() > limit {
                return Err(JohariError::SelectionLimitExceeded {
                    limit,
                    attempted: selections.len(),
                });
            }
        }

        Ok(selections)
    }
}
