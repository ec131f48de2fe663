//! Story routes. Every endpoint requires a Bearer token.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{locks, stories};
use crate::state::AppState;

/// Story routes mounted at `/stories`.
///
/// ```text
/// POST   /                  -> create_story
/// GET    /drafts            -> list_my_drafts
/// GET    /published         -> list_my_published
/// GET    /{id}              -> get_story
/// PUT    /{id}              -> update_story
/// DELETE /{id}              -> delete_story
/// GET    /{id}/lock         -> get_lock_status
/// POST   /{id}/lock         -> acquire_lock
/// PUT    /{id}/lock         -> refresh_lock
/// DELETE /{id}/lock         -> release_lock
/// POST   /{id}/publish      -> publish_story
/// POST   /{id}/unpublish    -> unpublish_story
/// POST   /{id}/pin          -> pin_story
/// POST   /{id}/unpin        -> unpin_story
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(stories::create_story))
        .route("/drafts", get(stories::list_my_drafts))
        .route("/published", get(stories::list_my_published))
        .route(
            "/{id}",
            get(stories::get_story)
                .put(stories::update_story)
                .delete(stories::delete_story),
        )
        .route(
            "/{id}/lock",
            get(locks::get_lock_status)
                .post(locks::acquire_lock)
                .put(locks::refresh_lock)
                .delete(locks::release_lock),
        )
        .route("/{id}/publish", post(stories::publish_story))
        .route("/{id}/unpublish", post(stories::unpublish_story))
        .route("/{id}/pin", post(stories::pin_story))
        .route("/{id}/unpin", post(stories::unpin_story))
}
