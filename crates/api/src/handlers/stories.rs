//! Handlers for stories: CRUD, publishing, pinning and listings.
//!
//! Every story lookup is scoped to the caller's course. Changes to a story are
//! refused with 409 while another journalist holds its editing lock; the
//! write statements repeat that check so a lock taken mid-request still wins.
//! Successful changes are appended to the course activity feed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use storyflam_core::activity::activity_action;
use storyflam_core::content::StoryContent;
use storyflam_core::error::CoreError;
use storyflam_core::locking::LockError;
use storyflam_core::stories::{is_valid_status, validate_title, VALID_STORY_STATUSES};
use storyflam_core::types::StoryId;
use storyflam_db::models::activity::CreateActivity;
use storyflam_db::models::story::{CreateStory, Editor, Story, UpdateStory};
use storyflam_db::repositories::{ActivityRepo, StoryRepo};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireModerator;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /stories`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub summary: Option<String>,
    #[validate(url)]
    pub featured_image_url: Option<String>,
    pub content: Option<StoryContent>,
    /// Defaults to the caller's own publication.
    #[validate(length(min = 1, max = 100))]
    pub publication_name: Option<String>,
    pub status: Option<String>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field
/// (`None`, via `#[serde(default)]`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `PUT /stories/{id}`. All fields are optional; `summary` and
/// `featured_image_url` are cleared by sending `null`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateStoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 1000))]
    pub summary: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(url)]
    pub featured_image_url: Option<Option<String>>,
    pub content: Option<StoryContent>,
    pub status: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub publication_name: Option<String>,
}

fn check_status(status: Option<&str>) -> AppResult<()> {
    match status {
        Some(s) if !is_valid_status(s) => Err(AppError::BadRequest(format!(
            "Invalid status '{s}'. Must be one of: {}",
            VALID_STORY_STATUSES.join(", ")
        ))),
        _ => Ok(()),
    }
}

fn check_content(content: Option<&StoryContent>) -> AppResult<()> {
    match content {
        Some(content) => content
            .validate()
            .map_err(|msg| AppError::Core(CoreError::Validation(msg))),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn story_not_found(id: StoryId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Story",
        id: id.to_string(),
    })
}

/// Load a story, treating stories from other courses as missing.
async fn find_in_course(state: &AppState, auth: &AuthUser, id: StoryId) -> AppResult<Story> {
    StoryRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|story| story.course_id == auth.course_id)
        .ok_or_else(|| story_not_found(id))
}

/// Load a story the caller may change and that nobody else is editing.
async fn find_modifiable(state: &AppState, auth: &AuthUser, id: StoryId) -> AppResult<Story> {
    let story = find_in_course(state, auth, id).await?;

    if !auth.can_modify(&story.author_name) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the author or a moderator can change this story".into(),
        )));
    }

    let lock = story.lock_fields();
    if lock.blocks(&auth.name, Utc::now(), state.locks.policy().timeout) {
        let holder = lock.locked_by.unwrap_or_default();
        return Err(LockError::Conflict { holder }.into());
    }

    Ok(story)
}

fn editor<'a>(state: &AppState, auth: &'a AuthUser) -> Editor<'a> {
    Editor {
        name: &auth.name,
        stale_before: state.locks.policy().stale_before(Utc::now()),
    }
}

/// The error for a guarded write that matched no row.
async fn write_refused(state: &AppState, auth: &AuthUser, id: StoryId) -> AppError {
    match find_modifiable(state, auth, id).await {
        Err(err) => err,
        // The blocking lock was released again before the re-read.
        Ok(_) => LockError::Contended.into(),
    }
}

/// Append to the course activity feed. A failed append is logged and does
/// not fail the change that triggered it.
async fn record(
    state: &AppState,
    auth: &AuthUser,
    story: &Story,
    action: &str,
    details: Option<serde_json::Value>,
) {
    let entry = CreateActivity {
        course_id: story.course_id.clone(),
        publication_name: Some(story.publication_name.clone()),
        journalist_name: Some(auth.name.clone()),
        action: action.to_string(),
        story_id: Some(story.id),
        story_title: Some(story.title.clone()),
        details,
    };
    if let Err(err) = ActivityRepo::log(&state.pool, &entry).await {
        tracing::warn!(error = %err, story_id = %story.id, action, "Failed to record activity");
    }
}

/// Names of the fields an update touches, for the activity feed.
fn changed_fields(input: &UpdateStoryRequest) -> Vec<&'static str> {
    [
        ("title", input.title.is_some()),
        ("summary", input.summary.is_some()),
        ("featured_image_url", input.featured_image_url.is_some()),
        ("content", input.content.is_some()),
        ("status", input.status.is_some()),
        ("publication_name", input.publication_name.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, present)| present.then_some(name))
    .collect()
}

/// A story in a listing, with the word count of its body.
#[derive(Debug, Serialize)]
pub struct StoryListItem {
    #[serde(flatten)]
    pub story: Story,
    pub word_count: usize,
}

impl From<Story> for StoryListItem {
    fn from(story: Story) -> Self {
        let word_count = story.word_count();
        Self { story, word_count }
    }
}

fn list_items(stories: Vec<Story>) -> Vec<StoryListItem> {
    stories.into_iter().map(StoryListItem::from).collect()
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/stories
pub async fn create_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateStoryRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_title(&input.title).map_err(AppError::BadRequest)?;
    check_status(input.status.as_deref())?;
    check_content(input.content.as_ref())?;

    let publication_name = input
        .publication_name
        .or_else(|| auth.publication_name.clone())
        .ok_or_else(|| {
            AppError::BadRequest("publication_name is required when none is assigned".into())
        })?;

    let create = CreateStory {
        course_id: auth.course_id.clone(),
        publication_name,
        author_name: auth.name.clone(),
        title: input.title,
        summary: input.summary,
        featured_image_url: input.featured_image_url,
        content: Some(input.content.unwrap_or_else(StoryContent::empty)),
        status: input.status,
    };
    let story = StoryRepo::create(&state.pool, &create).await?;

    tracing::info!(story_id = %story.id, author = %story.author_name, "Story created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: story })))
}

/// GET /api/v1/stories/{id}
pub async fn get_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    let story = find_in_course(&state, &auth, id).await?;
    Ok(Json(DataResponse { data: story }))
}

/// PUT /api/v1/stories/{id}
pub async fn update_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
    Json(input): Json<UpdateStoryRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if let Some(title) = &input.title {
        validate_title(title).map_err(AppError::BadRequest)?;
    }
    check_status(input.status.as_deref())?;
    check_content(input.content.as_ref())?;

    find_modifiable(&state, &auth, id).await?;

    let fields = changed_fields(&input);
    let update = UpdateStory {
        title: input.title,
        summary: input.summary,
        featured_image_url: input.featured_image_url,
        content: input.content,
        status: input.status,
        publication_name: input.publication_name,
    };
    let Some(story) = StoryRepo::update(&state.pool, id, &update, &editor(&state, &auth)).await?
    else {
        return Err(write_refused(&state, &auth, id).await);
    };

    record(
        &state,
        &auth,
        &story,
        activity_action::EDITED,
        Some(serde_json::json!({ "fields": fields })),
    )
    .await;
    Ok(Json(DataResponse { data: story }))
}

/// DELETE /api/v1/stories/{id}
pub async fn delete_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    let story = find_modifiable(&state, &auth, id).await?;

    if !StoryRepo::delete(&state.pool, id, &editor(&state, &auth)).await? {
        return Err(write_refused(&state, &auth, id).await);
    }

    tracing::info!(story_id = %id, user = %auth.name, "Story deleted");
    record(&state, &auth, &story, activity_action::DELETED, None).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Publishing and pinning
// ---------------------------------------------------------------------------

/// POST /api/v1/stories/{id}/publish
pub async fn publish_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    find_modifiable(&state, &auth, id).await?;

    let Some(story) = StoryRepo::publish(&state.pool, id, &editor(&state, &auth)).await? else {
        return Err(write_refused(&state, &auth, id).await);
    };

    tracing::info!(story_id = %id, user = %auth.name, "Story published");
    record(&state, &auth, &story, activity_action::PUBLISHED, None).await;
    Ok(Json(DataResponse { data: story }))
}

/// POST /api/v1/stories/{id}/unpublish
pub async fn unpublish_story(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    find_modifiable(&state, &auth, id).await?;

    let Some(story) = StoryRepo::unpublish(&state.pool, id, &editor(&state, &auth)).await? else {
        return Err(write_refused(&state, &auth, id).await);
    };

    tracing::info!(story_id = %id, user = %auth.name, "Story unpublished");
    record(&state, &auth, &story, activity_action::UNPUBLISHED, None).await;
    Ok(Json(DataResponse { data: story }))
}

/// POST /api/v1/stories/{id}/pin
///
/// Moderators only. Pinning beyond the per-publication limit unpins the
/// oldest pin.
pub async fn pin_story(
    RequireModerator(auth): RequireModerator,
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    let story = find_in_course(&state, &auth, id).await?;

    let story = StoryRepo::pin(&state.pool, id, &story.course_id, &story.publication_name)
        .await?
        .ok_or_else(|| story_not_found(id))?;

    tracing::info!(story_id = %id, publication = %story.publication_name, "Story pinned");
    record(&state, &auth, &story, activity_action::PINNED, None).await;
    Ok(Json(DataResponse { data: story }))
}

/// POST /api/v1/stories/{id}/unpin
pub async fn unpin_story(
    RequireModerator(auth): RequireModerator,
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    find_in_course(&state, &auth, id).await?;

    let story = StoryRepo::unpin(&state.pool, id)
        .await?
        .ok_or_else(|| story_not_found(id))?;

    record(&state, &auth, &story, activity_action::UNPINNED, None).await;
    Ok(Json(DataResponse { data: story }))
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// GET /api/v1/stories/drafts
pub async fn list_my_drafts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let stories = StoryRepo::list_drafts(&state.pool, &auth.course_id, &auth.name).await?;
    Ok(Json(DataResponse {
        data: list_items(stories),
    }))
}

/// GET /api/v1/stories/published
pub async fn list_my_published(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let stories = StoryRepo::list_published(&state.pool, &auth.course_id, &auth.name).await?;
    Ok(Json(DataResponse {
        data: list_items(stories),
    }))
}

/// GET /api/v1/publications/{name}/stream
pub async fn publication_stream(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(publication_name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let stories =
        StoryRepo::publication_stream(&state.pool, &auth.course_id, &publication_name).await?;
    Ok(Json(DataResponse {
        data: list_items(stories),
    }))
}
