//! Document store adapter.
//!
//! Sessions and feedback live behind [`DocumentStore`], a small
//! document-oriented interface with change subscriptions. Paths are
//! slash-separated: a document sits at `{collection}/{id}`, and a
//! collection may be nested under a document (`sessions/{id}/feedback`),
//! which is how feedback records are scoped to their session without any
//! query filter.
//!
//! `set_full` is an atomic whole-document create-or-replace at a
//! caller-chosen path. It is the only write primitive besides `create`, so
//! an upsert keyed by path can never race itself into two documents.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A failed adapter operation. Callers treat any value as "store
/// unavailable"; the variants exist so the log line says what actually
/// happened.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing engine rejected or failed the operation.
    #[error("{0}")]
    Backend(#[from] anyhow::Error),

    /// A stored document could not be decoded into the expected shape.
    #[error("malformed document at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(err.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend(err.into())
    }
}

/// A document returned from a collection query.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Callback receiving the path of every changed document under a
/// subscription's prefix.
pub type ChangeCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Adapter boundary over a document-oriented store with realtime change
/// delivery. Both backends are synchronous and fail fast; nothing here
/// blocks on anything slower than the engine itself.
pub trait DocumentStore: Send + Sync + 'static {
    /// Write `data` as a new document under a store-allocated id inside
    /// `collection`; returns the id.
    fn create(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Read the document at `path`; `None` when absent.
    fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Atomically create or replace the whole document at `path`.
    fn set_full(&self, path: &str, data: Value) -> Result<(), StoreError>;

    /// All direct children of `collection` in id order. Documents nested
    /// deeper (grandchildren) are not included.
    fn query(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Deliver every changed path at or under `prefix` to `callback` until
    /// the returned handle is cancelled or dropped.
    fn subscribe(&self, prefix: &str, callback: ChangeCallback) -> Subscription;
}

/// Split a document path into its collection and id segments.
fn split_path(path: &str) -> Result<(&str, &str), StoreError> {
    path.rsplit_once('/')
        .filter(|(collection, id)| !collection.is_empty() && !id.is_empty())
        .ok_or_else(|| {
            StoreError::Backend(anyhow::anyhow!(
                "document path {path:?} has no collection segment"
            ))
        })
}

/// Fan-out of changed document paths to live subscribers.
///
/// Writers publish the path of every successful mutation. Each subscriber
/// runs on its own task and only sees paths under its prefix. A subscriber
/// that lags the channel skips ahead instead of erroring: consumers rebuild
/// from a full read on every notification, so a missed path costs nothing.
#[derive(Debug, Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<String>,
}

impl ChangeHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Announce a changed path. A send with no live subscribers is fine.
    pub fn publish(&self, path: &str) {
        let _ = self.tx.send(path.to_string());
    }

    /// Forward changed paths under `prefix` to `callback` on a spawned
    /// task. Must be called from within a tokio runtime.
    pub fn subscribe(&self, prefix: &str, callback: ChangeCallback) -> Subscription {
        let mut rx = self.tx.subscribe();
        let prefix = prefix.to_string();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(path) => {
                        if path == prefix || path.starts_with(&format!("{prefix}/")) {
                            callback(&path);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription::new(task)
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Live handle to a change subscription.
///
/// Dropping the handle, or calling [`Subscription::cancel`], stops delivery
/// and releases the underlying receiver. `cancel` is idempotent; observers
/// tearing down should just let the handle drop.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Stop delivery. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether the subscription is still delivering.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
