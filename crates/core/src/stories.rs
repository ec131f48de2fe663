//! Story publishing rules shared by the repository and HTTP layers.

// ---------------------------------------------------------------------------
// Status values
// ---------------------------------------------------------------------------

/// Known story status values (stored in `stories.status`).
pub mod story_status {
    pub const DRAFT: &str = "draft";
    pub const PUBLISHED: &str = "published";
}

/// The set of all valid story statuses.
pub const VALID_STORY_STATUSES: &[&str] = &[story_status::DRAFT, story_status::PUBLISHED];

/// Returns `true` if the given status is valid.
pub fn is_valid_status(status: &str) -> bool {
    VALID_STORY_STATUSES.contains(&status)
}

// ---------------------------------------------------------------------------
// Pinning
// ---------------------------------------------------------------------------

/// At most this many stories are pinned per publication. Pinning another one
/// unpins the oldest pin.
pub const MAX_PINNED_STORIES: usize = 3;

/// How many of the `currently_pinned` stories must be unpinned before one more
/// can be pinned.
pub fn pins_to_evict(currently_pinned: usize) -> usize {
    (currently_pinned + 1).saturating_sub(MAX_PINNED_STORIES)
}

// ---------------------------------------------------------------------------
// Field limits
// ---------------------------------------------------------------------------

pub const MAX_TITLE_LEN: usize = 200;

/// Validate a story title. Returns `Ok(())` or an error message.
pub fn validate_title(title: &str) -> Result<(), String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Story title must not be empty".to_string());
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(format!(
            "Story title must be at most {MAX_TITLE_LEN} characters"
        ));
    }
    Ok(())
}
