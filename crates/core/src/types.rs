/// Stories are keyed by UUID primary keys.
pub type StoryId = uuid::Uuid;

pub type ActivityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
