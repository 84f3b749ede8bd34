//! Domain models for the Johari Window exercise.
//!
//! # Core Concepts
//!
//! ## Persistent Entities
//!
//! - [`Session`]: one subject's window: owner identity, display name and
//!   the subject's own descriptor selections. Created empty, becomes
//!   "self-assessed" with the first non-empty submission, never deleted.
//! - [`FeedbackRecord`]: one peer's perception of a session's subject.
//!   Keyed by (session, submitter); resubmitting replaces the record
//!   instead of adding another.
//!
//! ## Derived Values
//!
//! These are recomputed on demand and never stored:
//!
//! - [`Partition`]: the four window quadrants (Arena, Blind Spot, Facade,
//!   Unknown), computed from the self-selections and the union of all
//!   feedback selections over the fixed [`Vocabulary`].
//! - [`WindowSnapshot`]: session + feedback + partition, the unit a live
//!   subscription delivers on every change.

mod partition;
mod session;
mod vocabulary;

pub use partition::*;
pub use session::*;
pub use vocabulary::*;
