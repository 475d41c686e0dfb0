//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - collections(id, name, created_at, updated_at)
//! - tags(id, collection_id, name, created_at, updated_at)
//! - data_points(id, tag_id, value)
//!
//! Tags cascade-delete with their collection, data points with their tag.

pub mod schema;
pub mod sqlite;

pub use sqlite::{Database, DbStats};
