//! Storage seam for lock state.
//!
//! Every method is a single statement against the story row(s), so callers
//! never need a separate read before a write.

use async_trait::async_trait;

use super::LockFields;
use crate::types::{StoryId, Timestamp};

/// Failure reported by a lock store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Story {0} not found")]
    NotFound(StoryId),

    #[error("{0}")]
    Backend(String),
}

/// Result of an atomic acquire attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The caller now holds the lock with these fields.
    Acquired(LockFields),
    /// The conditional write matched nothing; these are the fields read back.
    Held(LockFields),
}

/// Persistence for the `locked_by` / `locked_at` pair on stories.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// The course a story belongs to.
    async fn course_of(&self, story_id: StoryId) -> Result<String, StoreError>;

    /// Point read of a story's lock fields.
    async fn read(&self, story_id: StoryId) -> Result<LockFields, StoreError>;

    /// Write `(holder, now)` if the story is unlocked, held by `holder`, has no
    /// timestamp, or was stamped before `stale_before`. Otherwise report the
    /// fields that blocked the write.
    async fn try_acquire(
        &self,
        story_id: StoryId,
        holder: &str,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<AcquireOutcome, StoreError>;

    /// Bump `locked_at` to `now` where `locked_by = holder`. Returns rows affected.
    async fn refresh(
        &self,
        story_id: StoryId,
        holder: &str,
        now: Timestamp,
    ) -> Result<u64, StoreError>;

    /// Clear both fields regardless of holder. Returns rows affected.
    async fn clear(&self, story_id: StoryId) -> Result<u64, StoreError>;

    /// Clear every lock stamped before `stale_before`. Returns rows affected.
    async fn clear_stale(&self, stale_before: Timestamp) -> Result<u64, StoreError>;
}
