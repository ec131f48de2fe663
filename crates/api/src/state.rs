use std::sync::Arc;

use storyflam_core::locking::LockManager;

use crate::config::ServerConfig;

/// Handler state. Clones share the pool, config and lock store.
#[derive(Clone)]
pub struct AppState {
    pub pool: storyflam_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Lock manager over the same database as `pool` in production, or an
    /// in-memory store in tests.
    pub locks: LockManager,
}
