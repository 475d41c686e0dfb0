//! # Cognivault - Tagged snippet collections over HTTP
//!
//! Cognivault stores text snippets ("data points") grouped under tags, and
//! tags grouped under named collections.
//!
//! Cognivault provides:
//! - SQLite-backed storage with cascade-delete referential integrity
//! - Collection, Tag and DataPoint entities with parameter-bound CRUD
//! - Content acquisition from inline text, URLs, or local files
//! - An axum HTTP API exposing the above as JSON, documented with OpenAPI

pub mod id;
pub mod collection;
pub mod tag;
pub mod data_point;
pub mod storage;
pub mod source;
pub mod server;
pub mod config;

// Re-exports for convenient access
pub use collection::Collection;
pub use tag::Tag;
pub use data_point::DataPoint;
pub use storage::Database;
pub use source::{ContentFetcher, ContentSource, HttpFetcher};

/// Result type alias for Cognivault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Cognivault operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Acquisition error: {0}")]
    Acquisition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
