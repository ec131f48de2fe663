//! Role gates layered on top of [`AuthUser`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use storyflam_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// An [`AuthUser`] who is a trainer or guest editor. Anyone else gets 403.
///
/// Used for pinning and for the manual lock sweep.
#[derive(Debug, Clone)]
pub struct RequireModerator(pub AuthUser);

impl FromRequestParts<AppState> for RequireModerator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.is_moderator() {
            Ok(Self(user))
        } else {
            tracing::debug!(user = %user.name, role = %user.role, "Moderator role required");
            Err(AppError::Core(CoreError::Forbidden(
                "Trainer or guest editor role required".into(),
            )))
        }
    }
}
