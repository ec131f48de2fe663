use axum::routing::get;
use axum::Router;

use crate::handlers::stories;
use crate::state::AppState;

/// Publication routes mounted at `/publications`.
///
/// ```text
/// GET /{name}/stream    -> publication_stream
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{name}/stream", get(stories::publication_stream))
}
