//! Story entity model and DTOs.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use storyflam_core::content::StoryContent;
use storyflam_core::locking::LockFields;
use storyflam_core::types::{StoryId, Timestamp};

/// A story row from the `stories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Story {
    pub id: StoryId,
    pub course_id: String,
    pub publication_name: String,
    pub author_name: String,
    pub title: String,
    pub summary: Option<String>,
    pub featured_image_url: Option<String>,
    pub content: Option<Json<StoryContent>>,
    pub status: String,
    pub is_pinned: bool,
    pub pin_timestamp: Option<Timestamp>,
    pub locked_by: Option<String>,
    pub locked_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Story {
    /// The raw lock columns of this row.
    pub fn lock_fields(&self) -> LockFields {
        LockFields {
            locked_by: self.locked_by.clone(),
            locked_at: self.locked_at,
        }
    }

    /// Words in the body; zero when there is none.
    pub fn word_count(&self) -> usize {
        self.content.as_ref().map_or(0, |content| content.0.word_count())
    }
}

/// DTO for inserting a new story. Status defaults to `draft` when `None`.
#[derive(Debug, Clone)]
pub struct CreateStory {
    pub course_id: String,
    pub publication_name: String,
    pub author_name: String,
    pub title: String,
    pub summary: Option<String>,
    pub featured_image_url: Option<String>,
    pub content: Option<StoryContent>,
    pub status: Option<String>,
}

/// DTO for updating an existing story. All fields are optional.
///
/// `summary` and `featured_image_url` are nullable columns: the outer
/// `Option` says whether to touch the column, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateStory {
    pub title: Option<String>,
    pub summary: Option<Option<String>>,
    pub featured_image_url: Option<Option<String>>,
    pub content: Option<StoryContent>,
    pub status: Option<String>,
    pub publication_name: Option<String>,
}

/// Whoever is writing a story, checked against its editing lock inside the
/// write statement itself.
#[derive(Debug, Clone, Copy)]
pub struct Editor<'a> {
    pub name: &'a str,
    /// Locks stamped before this instant have expired.
    pub stale_before: Timestamp,
}
