//! Activity log entry model and DTO.

use serde::Serialize;
use sqlx::FromRow;
use storyflam_core::types::{ActivityId, StoryId, Timestamp};

/// A row from the `activity_log` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityEntry {
    pub id: ActivityId,
    pub course_id: String,
    pub publication_name: Option<String>,
    /// Who performed the action.
    pub journalist_name: Option<String>,
    pub action: String,
    pub story_id: Option<StoryId>,
    pub story_title: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

/// DTO for appending an entry.
#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub course_id: String,
    pub publication_name: Option<String>,
    pub journalist_name: Option<String>,
    pub action: String,
    pub story_id: Option<StoryId>,
    pub story_title: Option<String>,
    pub details: Option<serde_json::Value>,
}
