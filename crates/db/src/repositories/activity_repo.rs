//! Repository for the `activity_log` table.

use sqlx::PgPool;

use crate::models::activity::{ActivityEntry, CreateActivity};

const COLUMNS: &str = "id, course_id, publication_name, journalist_name, action, story_id, \
                       story_title, details, created_at";

/// Append-only access to the course activity feed.
pub struct ActivityRepo;

impl ActivityRepo {
    /// Append an entry, returning the stored row.
    pub async fn log(
        pool: &PgPool,
        input: &CreateActivity,
    ) -> Result<ActivityEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO activity_log (course_id, publication_name, journalist_name, action, \
                                       story_id, story_title, details)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityEntry>(&query)
            .bind(&input.course_id)
            .bind(&input.publication_name)
            .bind(&input.journalist_name)
            .bind(&input.action)
            .bind(input.story_id)
            .bind(&input.story_title)
            .bind(&input.details)
            .fetch_one(pool)
            .await
    }

    /// The newest `limit` entries of a course, newest first.
    pub async fn list_for_course(
        pool: &PgPool,
        course_id: &str,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activity_log \
             WHERE course_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, ActivityEntry>(&query)
            .bind(course_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
