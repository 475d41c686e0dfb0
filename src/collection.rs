//! Collections - the top-level named grouping of content
//!
//! A collection owns its tags, which in turn own their data points. Names are
//! not unique: lookups by name resolve to the earliest created collection
//! carrying that name.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::{Error, Result};
use crate::data_point::DataPoint;
use crate::id;
use crate::tag::Tag;

const SELECT_COLLECTION: &str = "SELECT id, name, created_at, updated_at FROM collections";

/// A named grouping of tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Collection {
    /// Unique, immutable identifier (UUIDv7)
    pub id: String,
    /// Display name, not required to be unique
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    /// Insert a new collection with a fresh id and timestamps
    pub fn create(conn: &Connection, name: impl Into<String>) -> Result<Self> {
        let now = id::now();
        let collection = Self {
            id: id::generate(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO collections (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                collection.id,
                collection.name,
                collection.created_at,
                collection.updated_at,
            ],
        )?;
        tracing::debug!(id = %collection.id, name = %collection.name, "created collection");
        Ok(collection)
    }

    /// Get a collection by name
    pub fn get(conn: &Connection, name: &str) -> Result<Self> {
        conn.query_row(
            &format!("{SELECT_COLLECTION} WHERE name = ?1 ORDER BY created_at, id LIMIT 1"),
            [name],
            Self::from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("collection '{}'", name)))
    }

    /// Get a collection by id
    pub fn get_by_id(conn: &Connection, id: &str) -> Result<Self> {
        conn.query_row(
            &format!("{SELECT_COLLECTION} WHERE id = ?1"),
            [id],
            Self::from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("collection with id {}", id)))
    }

    /// List every collection in creation order
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!("{SELECT_COLLECTION} ORDER BY id"))?;
        let collections = stmt
            .query_map([], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(collections)
    }

    /// Rename the collection.
    ///
    /// `updated_at` always moves strictly forward.
    pub fn update(&mut self, conn: &Connection, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        let updated_at = id::touch(self.updated_at);

        let changed = conn.execute(
            "UPDATE collections SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_name, updated_at, self.id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("collection with id {}", self.id)));
        }

        tracing::debug!(id = %self.id, from = %self.name, to = %new_name, "renamed collection");
        self.name = new_name;
        self.updated_at = updated_at;
        Ok(())
    }

    /// Delete the collection; tags and data points go with it by cascade.
    ///
    /// Returns whether a row was actually removed.
    pub fn delete(&self, conn: &Connection) -> Result<bool> {
        let removed = conn.execute("DELETE FROM collections WHERE id = ?1", [&self.id])?;
        tracing::debug!(id = %self.id, removed, "deleted collection");
        Ok(removed > 0)
    }

    /// Tags owned by this collection
    pub fn list_tags(&self, conn: &Connection) -> Result<Vec<Tag>> {
        Tag::list_for_collection(conn, &self.id)
    }

    /// Data points across every tag of this collection.
    ///
    /// With a non-empty `query`, only values containing it as a
    /// case-sensitive substring are returned. The query is matched literally;
    /// `%` and `_` carry no special meaning.
    pub fn list_data_points(&self, conn: &Connection, query: Option<&str>) -> Result<Vec<DataPoint>> {
        let query = query.filter(|q| !q.is_empty());
        let mut stmt = conn.prepare(
            r#"
            SELECT dp.id, dp.tag_id, dp.value
            FROM data_points dp
            JOIN tags t ON t.id = dp.tag_id
            WHERE t.collection_id = ?1
              AND (?2 IS NULL OR instr(dp.value, ?2) > 0)
            ORDER BY dp.id
            "#,
        )?;
        let data_points = stmt
            .query_map(params![self.id, query], DataPoint::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(data_points)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}
