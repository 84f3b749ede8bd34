//! Caller identity resolution.
//!
//! Every request is attributed to an [`Identity`]: session creators own
//! their sessions, and feedback records are keyed by the submitter. The
//! provider never rejects a caller. A bearer token maps to the same
//! identity on every request; a caller without one gets a fresh anonymous
//! identity instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque identifier for a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Maps optional credentials to an [`Identity`].
pub trait IdentityProvider: Send + Sync + 'static {
    /// Resolve a caller. `token` is the bearer token when one was
    /// presented. Implementations must return the same identity for the
    /// same token across calls.
    fn resolve(&self, token: Option<&str>) -> Identity;
}

/// In-process [`IdentityProvider`] that mints identities on first sight.
///
/// A token seen for the first time is bound to a new identity and keeps it
/// for the life of the process. Anonymous callers are deliberately not
/// remembered, so each tokenless request acts as a distinct participant.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    known: Mutex<HashMap<String, Identity>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityProvider for TokenRegistry {
    fn resolve(&self, token: Option<&str>) -> Identity {
        match token {
            Some(token) => self
                .known
                .lock()
                .expect("identity lock poisoned")
                .entry(token.to_string())
                .or_insert_with(|| Identity::new(format!("user-{}", Uuid::new_v4())))
                .clone(),
            None => Identity::new(format!("anon-{}", Uuid::new_v4())),
        }
    }
}
