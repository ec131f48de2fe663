//! Postgres-backed [`LockStore`] over the `stories.locked_by` / `locked_at`
//! columns.
//!
//! Each operation is one statement. `try_acquire` relies on Postgres
//! re-checking the `WHERE` clause against the latest row version when two
//! updates race, so only one of them can match.

use async_trait::async_trait;
use sqlx::PgPool;
use storyflam_core::locking::{AcquireOutcome, LockFields, LockStore, StoreError};
use storyflam_core::types::{StoryId, Timestamp};

type LockRow = (Option<String>, Option<Timestamp>);

fn into_fields((locked_by, locked_at): LockRow) -> LockFields {
    LockFields {
        locked_by,
        locked_at,
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::warn!(error = %err, "Lock store query failed");
    StoreError::Backend(err.to_string())
}

/// Story lock persistence in the `stories` table.
#[derive(Debug, Clone)]
pub struct PgLockStore {
    pool: PgPool,
}

impl PgLockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LockStore for PgLockStore {
    async fn course_of(&self, story_id: StoryId) -> Result<String, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT course_id FROM stories WHERE id = $1")
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound(story_id))
    }

    async fn read(&self, story_id: StoryId) -> Result<LockFields, StoreError> {
        sqlx::query_as::<_, LockRow>("SELECT locked_by, locked_at FROM stories WHERE id = $1")
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(into_fields)
            .ok_or(StoreError::NotFound(story_id))
    }

    async fn try_acquire(
        &self,
        story_id: StoryId,
        holder: &str,
        now: Timestamp,
        stale_before: Timestamp,
    ) -> Result<AcquireOutcome, StoreError> {
        let acquired = sqlx::query_as::<_, LockRow>(
            "UPDATE stories SET locked_by = $2, locked_at = $3 \
             WHERE id = $1 \
               AND (locked_by IS NULL OR locked_at IS NULL OR locked_by = $2 OR locked_at < $4) \
             RETURNING locked_by, locked_at",
        )
        .bind(story_id)
        .bind(holder)
        .bind(now)
        .bind(stale_before)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match acquired {
            Some(row) => Ok(AcquireOutcome::Acquired(into_fields(row))),
            None => Ok(AcquireOutcome::Held(self.read(story_id).await?)),
        }
    }

    async fn refresh(
        &self,
        story_id: StoryId,
        holder: &str,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        let result =
            sqlx::query("UPDATE stories SET locked_at = $3 WHERE id = $1 AND locked_by = $2")
                .bind(story_id)
                .bind(holder)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn clear(&self, story_id: StoryId) -> Result<u64, StoreError> {
        let result =
            sqlx::query("UPDATE stories SET locked_by = NULL, locked_at = NULL WHERE id = $1")
                .bind(story_id)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn clear_stale(&self, stale_before: Timestamp) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE stories SET locked_by = NULL, locked_at = NULL \
             WHERE locked_at IS NOT NULL AND locked_at < $1",
        )
        .bind(stale_before)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected())
    }
}
