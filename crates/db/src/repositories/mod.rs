//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod activity_repo;
pub mod story_repo;

pub use activity_repo::ActivityRepo;
pub use story_repo::StoryRepo;
