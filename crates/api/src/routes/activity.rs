use axum::routing::get;
use axum::Router;

use crate::handlers::activity;
use crate::state::AppState;

/// Activity feed route mounted at `/activity`.
///
/// ```text
/// GET /    -> list_activity (moderators only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(activity::list_activity))
}
