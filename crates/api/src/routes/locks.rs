use axum::routing::post;
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Lock maintenance routes mounted at `/locks`.
///
/// ```text
/// POST /sweep    -> sweep_stale_locks (moderators only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/sweep", post(locks::sweep_stale_locks))
}
