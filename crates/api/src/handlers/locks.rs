//! Handlers for story editing locks.
//!
//! The editor calls `acquire` when it opens a story, `refresh` on a timer while
//! it stays open, and `release` when it closes. Anyone in the story's course
//! may release a lock so trainers can free a story left open in a closed tab.
//! Stories of other courses answer 404, as the story endpoints do.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use storyflam_core::locking::{validate_holder_name, LockError, StoreError};
use storyflam_core::types::StoryId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireModerator;
use crate::response::DataResponse;
use crate::state::AppState;

async fn ensure_in_course(state: &AppState, auth: &AuthUser, story_id: StoryId) -> AppResult<()> {
    let course_id = state.locks.course_of(story_id).await?;
    if course_id != auth.course_id {
        return Err(LockError::from(StoreError::NotFound(story_id)).into());
    }
    Ok(())
}

/// GET /api/v1/stories/{id}/lock
///
/// Lock status of a story from the caller's point of view.
pub async fn get_lock_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    ensure_in_course(&state, &auth, story_id).await?;
    let status = state.locks.check(story_id, &auth.name).await?;
    Ok(Json(DataResponse { data: status }))
}

/// POST /api/v1/stories/{id}/lock
///
/// Take the editing lock. Returns 409 `LOCK_CONFLICT` naming the holder if
/// someone else is editing.
pub async fn acquire_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    ensure_in_course(&state, &auth, story_id).await?;
    validate_holder_name(&auth.name).map_err(AppError::BadRequest)?;

    let status = state.locks.acquire(story_id, &auth.name).await?;

    tracing::info!(%story_id, user = %auth.name, "Story lock acquired");
    Ok(Json(DataResponse { data: status }))
}

/// PUT /api/v1/stories/{id}/lock
///
/// Keep the caller's lock alive. Returns 409 `LOCK_NOT_HELD` if the lock was
/// lost, in which case the editor should try to acquire again.
pub async fn refresh_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    ensure_in_course(&state, &auth, story_id).await?;
    let status = state.locks.refresh(story_id, &auth.name).await?;

    tracing::debug!(%story_id, user = %auth.name, "Story lock refreshed");
    Ok(Json(DataResponse { data: status }))
}

/// DELETE /api/v1/stories/{id}/lock
///
/// Clear the lock whoever holds it.
pub async fn release_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<StoryId>,
) -> AppResult<impl IntoResponse> {
    ensure_in_course(&state, &auth, story_id).await?;
    state.locks.release(story_id).await?;

    tracing::info!(%story_id, user = %auth.name, role = %auth.role, "Story lock released");
    Ok(Json(DataResponse {
        data: serde_json::json!({ "released": true }),
    }))
}

/// POST /api/v1/locks/sweep
///
/// Run the stale-lock sweep now instead of waiting for the next interval.
pub async fn sweep_stale_locks(
    RequireModerator(auth): RequireModerator,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let cleared = state.locks.cleanup_stale().await?;

    tracing::info!(cleared, user = %auth.name, "Manual stale-lock sweep");
    Ok(Json(DataResponse {
        data: serde_json::json!({ "cleared": cleared }),
    }))
}
