//! Handler for the course activity feed.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use storyflam_core::activity::clamp_activity_limit;
use storyflam_db::repositories::ActivityRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireModerator;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub limit: Option<i64>,
}

/// GET /api/v1/activity?limit=
///
/// The caller's course feed, newest first. Moderators only.
pub async fn list_activity(
    RequireModerator(auth): RequireModerator,
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_activity_limit(params.limit);
    let entries = ActivityRepo::list_for_course(&state.pool, &auth.course_id, limit).await?;
    Ok(Json(DataResponse { data: entries }))
}
