//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for patches, where rows are mutable

pub mod activity;
pub mod story;
