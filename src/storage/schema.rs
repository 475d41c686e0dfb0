//! Database schema definitions

/// Foreign keys are off by default in SQLite and must be enabled per connection
pub const ENABLE_FOREIGN_KEYS: &str = "PRAGMA foreign_keys = ON";

/// SQL to create the collections table
pub const CREATE_COLLECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create the tags table
pub const CREATE_TAGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    collection_id TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE CASCADE
)
"#;

/// SQL to create the data_points table
pub const CREATE_DATA_POINTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS data_points (
    id TEXT PRIMARY KEY,
    tag_id TEXT NOT NULL,
    value TEXT NOT NULL,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_collections_name ON collections(name)",
    "CREATE INDEX IF NOT EXISTS idx_tags_collection ON tags(collection_id)",
    "CREATE INDEX IF NOT EXISTS idx_data_points_tag ON data_points(tag_id)",
];

/// All schema creation statements, parents before children
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_COLLECTIONS_TABLE,
        CREATE_TAGS_TABLE,
        CREATE_DATA_POINTS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
