//! Course activity feed: what happened to which story, and who did it.

/// Known activity actions (stored in `activity_log.action`).
pub mod activity_action {
    pub const PUBLISHED: &str = "published";
    pub const UNPUBLISHED: &str = "unpublished";
    pub const EDITED: &str = "edited";
    pub const PINNED: &str = "pinned";
    pub const UNPINNED: &str = "unpinned";
    pub const DELETED: &str = "deleted";
}

pub const VALID_ACTIVITY_ACTIONS: &[&str] = &[
    activity_action::PUBLISHED,
    activity_action::UNPUBLISHED,
    activity_action::EDITED,
    activity_action::PINNED,
    activity_action::UNPINNED,
    activity_action::DELETED,
];

pub fn is_valid_action(action: &str) -> bool {
    VALID_ACTIVITY_ACTIONS.contains(&action)
}

/// Entries returned when the caller gives no limit.
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 100;

pub const MAX_ACTIVITY_LIMIT: i64 = 500;

/// Clamp a requested feed length to `1..=MAX_ACTIVITY_LIMIT`.
pub fn clamp_activity_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT)
}
