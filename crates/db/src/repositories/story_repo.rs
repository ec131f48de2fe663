//! Repository for the `stories` table.

use sqlx::types::Json;
use sqlx::PgPool;
use storyflam_core::stories::{pins_to_evict, story_status};
use storyflam_core::types::StoryId;

use crate::models::story::{CreateStory, Editor, Story, UpdateStory};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, course_id, publication_name, author_name, title, summary, \
                       featured_image_url, content, status, is_pinned, pin_timestamp, \
                       locked_by, locked_at, created_at, updated_at";

/// `WHERE` fragment matching rows that the editor bound at `$name` may write:
/// unlocked, locked by them, or holding a lock stamped before `$stale_before`.
fn unlocked_for(name: u8, stale_before: u8) -> String {
    format!(
        "(locked_by IS NULL OR locked_at IS NULL OR locked_by = ${name} \
          OR locked_at < ${stale_before})"
    )
}

/// Provides CRUD, publishing and pinning operations for stories.
pub struct StoryRepo;

impl StoryRepo {
    /// Insert a new story, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateStory) -> Result<Story, sqlx::Error> {
        let query = format!(
            "INSERT INTO stories (course_id, publication_name, author_name, title, summary, \
                                  featured_image_url, content, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, '{draft}'))
             RETURNING {COLUMNS}",
            draft = story_status::DRAFT,
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(&input.course_id)
            .bind(&input.publication_name)
            .bind(&input.author_name)
            .bind(&input.title)
            .bind(&input.summary)
            .bind(&input.featured_image_url)
            .bind(input.content.clone().map(Json))
            .bind(&input.status)
            .fetch_one(pool)
            .await
    }

    /// Find a story by its ID.
    pub async fn find_by_id(pool: &PgPool, id: StoryId) -> Result<Option<Story>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stories WHERE id = $1");
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update a story. Only non-`None` fields in `input` are applied and
    /// `updated_at` is always bumped. A story moved back to draft loses its
    /// pin.
    ///
    /// Returns `None` if no row with the given `id` exists or someone other
    /// than `editor` holds a live lock on it.
    pub async fn update(
        pool: &PgPool,
        id: StoryId,
        input: &UpdateStory,
        editor: &Editor<'_>,
    ) -> Result<Option<Story>, sqlx::Error> {
        let query = format!(
            "UPDATE stories SET
                title = COALESCE($2, title),
                summary = CASE WHEN $3 THEN $4 ELSE summary END,
                featured_image_url = CASE WHEN $5 THEN $6 ELSE featured_image_url END,
                content = COALESCE($7, content),
                status = COALESCE($8, status),
                publication_name = COALESCE($9, publication_name),
                is_pinned = is_pinned AND COALESCE($8, status) <> '{draft}',
                pin_timestamp = CASE WHEN COALESCE($8, status) = '{draft}' \
                                     THEN NULL ELSE pin_timestamp END,
                updated_at = NOW()
             WHERE id = $1 AND {unlocked}
             RETURNING {COLUMNS}",
            draft = story_status::DRAFT,
            unlocked = unlocked_for(10, 11),
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.summary.is_some())
            .bind(input.summary.as_ref().and_then(|v| v.as_deref()))
            .bind(input.featured_image_url.is_some())
            .bind(input.featured_image_url.as_ref().and_then(|v| v.as_deref()))
            .bind(input.content.clone().map(Json))
            .bind(&input.status)
            .bind(&input.publication_name)
            .bind(editor.name)
            .bind(editor.stale_before)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a story unless someone other than `editor` holds a
    /// live lock on it. Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        id: StoryId,
        editor: &Editor<'_>,
    ) -> Result<bool, sqlx::Error> {
        let query = format!("DELETE FROM stories WHERE id = $1 AND {}", unlocked_for(2, 3));
        let result = sqlx::query(&query)
            .bind(id)
            .bind(editor.name)
            .bind(editor.stale_before)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently delete several stories. Returns the number of rows removed.
    pub async fn delete_many(pool: &PgPool, ids: &[StoryId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM stories WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Mark a story as published.
    pub async fn publish(
        pool: &PgPool,
        id: StoryId,
        editor: &Editor<'_>,
    ) -> Result<Option<Story>, sqlx::Error> {
        let input = UpdateStory {
            status: Some(story_status::PUBLISHED.to_string()),
            ..UpdateStory::default()
        };
        Self::update(pool, id, &input, editor).await
    }

    /// Return a story to draft. Unpublished stories cannot stay pinned.
    pub async fn unpublish(
        pool: &PgPool,
        id: StoryId,
        editor: &Editor<'_>,
    ) -> Result<Option<Story>, sqlx::Error> {
        let input = UpdateStory {
            status: Some(story_status::DRAFT.to_string()),
            ..UpdateStory::default()
        };
        Self::update(pool, id, &input, editor).await
    }

    /// Pin a story to the top of its publication stream.
    ///
    /// If the publication already has the maximum number of pinned stories,
    /// the oldest pins are released first, in the same transaction.
    ///
    /// Returns `None` if the story does not exist in the given publication.
    pub async fn pin(
        pool: &PgPool,
        id: StoryId,
        course_id: &str,
        publication_name: &str,
    ) -> Result<Option<Story>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Row locks only cover stories that are already pinned, so two pins
        // racing on the same publication would both see room. Serialize them
        // per publication for the rest of the transaction.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1 || '/' || $2))")
            .bind(course_id)
            .bind(publication_name)
            .execute(&mut *tx)
            .await?;

        let pinned: Vec<(StoryId,)> = sqlx::query_as(
            "SELECT id FROM stories \
             WHERE course_id = $1 AND publication_name = $2 AND is_pinned = true AND id <> $3 \
             ORDER BY pin_timestamp ASC NULLS FIRST \
             FOR UPDATE",
        )
        .bind(course_id)
        .bind(publication_name)
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let evict: Vec<StoryId> = pinned
            .iter()
            .take(pins_to_evict(pinned.len()))
            .map(|(pinned_id,)| *pinned_id)
            .collect();

        if !evict.is_empty() {
            sqlx::query(
                "UPDATE stories SET is_pinned = false, pin_timestamp = NULL WHERE id = ANY($1)",
            )
            .bind(&evict)
            .execute(&mut *tx)
            .await?;
            tracing::debug!(count = evict.len(), publication_name, "Unpinned oldest stories");
        }

        let query = format!(
            "UPDATE stories SET is_pinned = true, pin_timestamp = NOW(), updated_at = NOW() \
             WHERE id = $1 AND course_id = $2 AND publication_name = $3 \
             RETURNING {COLUMNS}"
        );
        let story = sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(course_id)
            .bind(publication_name)
            .fetch_optional(&mut *tx)
            .await?;

        if story.is_some() {
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }
        Ok(story)
    }

    /// Remove a story's pin.
    pub async fn unpin(pool: &PgPool, id: StoryId) -> Result<Option<Story>, sqlx::Error> {
        let query = format!(
            "UPDATE stories SET is_pinned = false, pin_timestamp = NULL, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// An author's drafts, most recently edited first.
    pub async fn list_drafts(
        pool: &PgPool,
        course_id: &str,
        author_name: &str,
    ) -> Result<Vec<Story>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stories \
             WHERE course_id = $1 AND author_name = $2 AND status = '{draft}' \
             ORDER BY updated_at DESC",
            draft = story_status::DRAFT,
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(course_id)
            .bind(author_name)
            .fetch_all(pool)
            .await
    }

    /// An author's published stories, newest first.
    pub async fn list_published(
        pool: &PgPool,
        course_id: &str,
        author_name: &str,
    ) -> Result<Vec<Story>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stories \
             WHERE course_id = $1 AND author_name = $2 AND status = '{published}' \
             ORDER BY created_at DESC",
            published = story_status::PUBLISHED,
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(course_id)
            .bind(author_name)
            .fetch_all(pool)
            .await
    }

    /// Published stories of a publication: pinned first (newest pin first),
    /// then newest created.
    pub async fn publication_stream(
        pool: &PgPool,
        course_id: &str,
        publication_name: &str,
    ) -> Result<Vec<Story>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stories \
             WHERE course_id = $1 AND publication_name = $2 AND status = '{published}' \
             ORDER BY is_pinned DESC, pin_timestamp DESC NULLS LAST, created_at DESC",
            published = story_status::PUBLISHED,
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(course_id)
            .bind(publication_name)
            .fetch_all(pool)
            .await
    }
}
