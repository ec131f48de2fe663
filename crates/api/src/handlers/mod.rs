pub mod activity;
pub mod locks;
pub mod stories;
