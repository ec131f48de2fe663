//! In-process [`LockStore`] backed by a map of story rows.
//!
//! Applies the same predicates as the Postgres store under a single write
//! guard, so acquire stays atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AcquireOutcome, LockFields, LockStore, StoreError};
use crate::types::{StoryId, Timestamp};

#[derive(Debug)]
struct Row {
    course_id: String,
    fields: LockFields,
}

#[derive(Debug, Default)]
pub struct MemoryLockStore {
    rows: RwLock<HashMap<StoryId, Row>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a story of `course_id` with the given lock fields, replacing
    /// any existing row.
    pub async fn insert(
        &self,
        story_id: StoryId,
        course_id: impl Into<String>,
        fields: LockFields,
    ) {
        let row = Row {
            course_id: course_id.into(),
            fields,
        };
        self.rows.write().await.insert(story_id, row);
    }

    /// Snapshot of a story's lock fields, or `None` if the story is unknown.
    pub async fn get(&self, story_id: StoryId) -> Option<LockFields> {
        self.rows.read().await.get(&story_id).map(|row| row.fields.clone())
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn acquirable(fields: &LockFields, holder: &str, stale_before: Timestamp) -> bool {
    match (&fields.locked_by, fields.locked_at) {
        (None, _) | (_, None) => true,
        (Some(current), Some(at)) => current == holder || at < stale_before,
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn course_of(&self, story_id: StoryId) -> Result<String, StoreError> {
        self.rows
            .read()
            .await
            .get(&story_id)
            .map(|row| row.course_id.clone())
            .ok_or(StoreError::NotFound(story_id))
    }

    async fn read(&self, story_id: StoryId) -> Result<LockFields, StoreError> {
        self.get(story_id)
            .await
            .ok_or(StoreError::NotFound(story_id))
    }

    async fn try_acquire(
        &self,
        story_id: StoryId,
        holder: &str,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<AcquireOutcome, StoreError> {
        let mut rows = self.rows.write().await;
        let fields = &mut rows
            .get_mut(&story_id)
            .ok_or(StoreError::NotFound(story_id))?
            .fields;

        if !acquirable(fields, holder, stale_before) {
            return Ok(AcquireOutcome::Held(fields.clone()));
        }

        *fields = LockFields::held_by(holder, now);
        Ok(AcquireOutcome::Acquired(fields.clone()))
    }

    async fn refresh(
        &self,
        story_id: StoryId,
        holder: &str,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&story_id) {
            Some(row) if row.fields.locked_by.as_deref() == Some(holder) => {
                row.fields.locked_at = Some(now);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn clear(&self, story_id: StoryId) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&story_id) {
            Some(row) => {
                row.fields = LockFields::default();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn clear_stale(&self, stale_before: Timestamp) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        let mut cleared = 0;
        for row in rows.values_mut() {
            if row.fields.locked_at.is_some_and(|at| at < stale_before) {
                row.fields = LockFields::default();
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}
