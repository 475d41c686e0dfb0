//! Data points - single stored text payloads under a tag

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::{Error, Result};
use crate::id;

/// A single stored text payload.
///
/// `value` is arbitrary text and is only ever bound as a statement parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DataPoint {
    pub id: String,
    pub tag_id: String,
    pub value: String,
}

impl DataPoint {
    /// Insert a new data point under an existing tag
    pub fn create(conn: &Connection, tag_id: &str, value: impl Into<String>) -> Result<Self> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE id = ?1)",
            [tag_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::Validation(format!("tag with id {} does not exist", tag_id)));
        }

        let data_point = Self {
            id: id::generate(),
            tag_id: tag_id.to_string(),
            value: value.into(),
        };
        conn.execute(
            "INSERT INTO data_points (id, tag_id, value) VALUES (?1, ?2, ?3)",
            params![data_point.id, data_point.tag_id, data_point.value],
        )?;
        Ok(data_point)
    }

    /// Get a data point by id within a tag
    pub fn get(conn: &Connection, id: &str, tag_id: &str) -> Result<Self> {
        conn.query_row(
            "SELECT id, tag_id, value FROM data_points WHERE id = ?1 AND tag_id = ?2",
            [id, tag_id],
            Self::from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("data point with id {}", id)))
    }

    /// All data points of a tag in creation order
    pub fn list_for_tag(conn: &Connection, tag_id: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, tag_id, value FROM data_points WHERE tag_id = ?1 ORDER BY id",
        )?;
        let data_points = stmt
            .query_map([tag_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(data_points)
    }

    /// Replace the stored value
    pub fn update(&mut self, conn: &Connection, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let changed = conn.execute(
            "UPDATE data_points SET value = ?1 WHERE id = ?2 AND tag_id = ?3",
            params![value, self.id, self.tag_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("data point with id {}", self.id)));
        }
        self.value = value;
        Ok(())
    }

    /// Remove the data point
    pub fn delete(&self, conn: &Connection) -> Result<()> {
        let removed = conn.execute(
            "DELETE FROM data_points WHERE id = ?1 AND tag_id = ?2",
            [&self.id, &self.tag_id],
        )?;
        if removed == 0 {
            return Err(Error::NotFound(format!("data point with id {}", self.id)));
        }
        Ok(())
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tag_id: row.get(1)?,
            value: row.get(2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::storage::Database;
    use crate::tag::Tag;

    fn sample_tag(conn: &Connection) -> Tag {
        let collection = Collection::create(conn, "c").unwrap();
        Tag::create(conn, &collection.id, "t").unwrap()
    }

    #[test]
    fn test_data_point_crud() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let tag = sample_tag(conn);
            let mut dp = DataPoint::create(conn, &tag.id, "first draft")?;
            assert_eq!(DataPoint::get(conn, &dp.id, &tag.id)?, dp);

            dp.update(conn, "second draft")?;
            assert_eq!(DataPoint::get(conn, &dp.id, &tag.id)?.value, "second draft");

            dp.delete(conn)?;
            assert!(matches!(DataPoint::get(conn, &dp.id, &tag.id), Err(Error::NotFound(_))));
            assert!(matches!(dp.delete(conn), Err(Error::NotFound(_))));
            assert!(matches!(dp.update(conn, "late"), Err(Error::NotFound(_))));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_create_requires_tag() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let err = DataPoint::create(conn, "missing", "value").unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_arbitrary_text_round_trips() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let tag = sample_tag(conn);
            let text = "it's a \"quoted\" value; DELETE FROM tags; -- \u{1F980}\nend";
            let dp = DataPoint::create(conn, &tag.id, text)?;
            assert_eq!(DataPoint::get(conn, &dp.id, &tag.id)?.value, text);
            assert_eq!(tag.list_data_points(conn)?.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_list_in_creation_order() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let tag = sample_tag(conn);
            for value in ["a", "b", "c"] {
                DataPoint::create(conn, &tag.id, value)?;
            }
            let values: Vec<_> = DataPoint::list_for_tag(conn, &tag.id)?
                .into_iter()
                .map(|dp| dp.value)
                .collect();
            assert_eq!(values, vec!["a", "b", "c"]);
            Ok(())
        })
        .unwrap();
    }
}
