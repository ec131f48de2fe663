//! Bearer-token extractor identifying the caller.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use storyflam_core::error::CoreError;
use storyflam_core::roles::is_moderator;

use crate::auth::jwt::{validate_token, Claims};
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller of a request.
///
/// Taking `AuthUser` as a handler argument makes the route require a valid
/// token; requests without one are answered with 401.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Display name; doubles as the story lock holder name.
    pub name: String,
    pub course_id: String,
    /// `journalist`, `trainer` or `guest_editor`.
    pub role: String,
    pub publication_name: Option<String>,
}

impl AuthUser {
    pub fn is_moderator(&self) -> bool {
        is_moderator(&self.role)
    }

    /// Authors may change their own stories; moderators may change any story
    /// in their course.
    pub fn can_modify(&self, author_name: &str) -> bool {
        self.name == author_name || self.is_moderator()
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            name: claims.sub,
            course_id: claims.course_id,
            role: claims.role,
            publication_name: claims.publication_name,
        }
    }
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.to_string()))
}

/// The token part of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| unauthorized("Authorization header is not valid text"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Expected Authorization: Bearer <token>"))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = validate_token(token, &state.config.jwt).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            unauthorized("Invalid or expired token")
        })?;
        Ok(claims.into())
    }
}
