//! Domain logic for the StoryFlam newsroom backend.
//!
//! This crate performs no I/O of its own. Storage is reached through the
//! [`locking::LockStore`] trait so the lock protocol can be exercised against
//! Postgres in production and an in-memory store in tests.

pub mod activity;
pub mod content;
pub mod error;
pub mod locking;
pub mod roles;
pub mod stories;
pub mod types;
