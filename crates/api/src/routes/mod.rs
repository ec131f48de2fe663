pub mod activity;
pub mod health;
pub mod locks;
pub mod publications;
pub mod stories;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /stories                                 create (POST)
/// /stories/drafts                          caller's drafts (GET)
/// /stories/published                       caller's published stories (GET)
/// /stories/{id}                            get, update, delete
/// /stories/{id}/lock                       status, acquire, refresh, release
/// /stories/{id}/publish                    publish (POST)
/// /stories/{id}/unpublish                  back to draft (POST)
/// /stories/{id}/pin                        pin, moderators only (POST)
/// /stories/{id}/unpin                      unpin, moderators only (POST)
///
/// /publications/{name}/stream              published stories, pinned first
///
/// /locks/sweep                             clear stale locks now (POST)
///
/// /activity                                course feed, moderators only (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/stories", stories::router())
        .nest("/publications", publications::router())
        .nest("/locks", locks::router())
        .nest("/activity", activity::router())
}
