//! Backend for running Johari Window exercises.
//!
//! A session owner picks descriptors for themselves from a shared
//! vocabulary, peers pick descriptors for the owner, and the service keeps
//! a live four-quadrant partition of the vocabulary (arena, blind spot,
//! facade, unknown) for every session. State lives behind a small document
//! store with change subscriptions, served over HTTP with an SSE stream
//! per session.

pub mod api;
pub mod error;
pub mod identity;
pub mod manager;
pub mod models;
pub mod store;
