//! Tags - labels scoping a subset of data points within a collection

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::{Error, Result};
use crate::data_point::DataPoint;
use crate::id;

const SELECT_TAG: &str = "SELECT id, collection_id, name, created_at, updated_at FROM tags";

/// A label within a collection.
///
/// Identity is the pair (`id`, `collection_id`): every lookup and mutation is
/// scoped to the owning collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub id: String,
    pub collection_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    /// Insert a new tag under an existing collection.
    ///
    /// Fails with [`Error::Validation`] when the collection does not exist.
    pub fn create(conn: &Connection, collection_id: &str, name: impl Into<String>) -> Result<Self> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM collections WHERE id = ?1)",
            [collection_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::Validation(format!(
                "collection with id {} does not exist",
                collection_id
            )));
        }

        let now = id::now();
        let tag = Self {
            id: id::generate(),
            collection_id: collection_id.to_string(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO tags (id, collection_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![tag.id, tag.collection_id, tag.name, tag.created_at, tag.updated_at],
        )?;
        tracing::debug!(id = %tag.id, collection = %tag.collection_id, "created tag");
        Ok(tag)
    }

    /// Get a tag by id within a collection
    pub fn get(conn: &Connection, id: &str, collection_id: &str) -> Result<Self> {
        conn.query_row(
            &format!("{SELECT_TAG} WHERE id = ?1 AND collection_id = ?2"),
            [id, collection_id],
            Self::from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("tag with id {}", id)))
    }

    /// All tags of a collection in creation order
    pub fn list_for_collection(conn: &Connection, collection_id: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!("{SELECT_TAG} WHERE collection_id = ?1 ORDER BY id"))?;
        let tags = stmt
            .query_map([collection_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Rename the tag
    pub fn update(&mut self, conn: &Connection, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        let updated_at = id::touch(self.updated_at);

        let changed = conn.execute(
            "UPDATE tags SET name = ?1, updated_at = ?2 WHERE id = ?3 AND collection_id = ?4",
            params![new_name, updated_at, self.id, self.collection_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("tag with id {}", self.id)));
        }

        self.name = new_name;
        self.updated_at = updated_at;
        Ok(())
    }

    /// Delete this tag and its data points
    pub fn delete(&self, tx: &Transaction<'_>) -> Result<()> {
        Self::delete_by_id(tx, &self.id, &self.collection_id)
    }

    /// Delete a tag and its data points within the caller's transaction.
    ///
    /// Data points are removed first, then the tag row. Any error, including
    /// [`Error::NotFound`] when no tag row matches, must abandon the
    /// transaction so the data point delete is rolled back with it.
    pub fn delete_by_id(tx: &Transaction<'_>, id: &str, collection_id: &str) -> Result<()> {
        let data_points = tx.execute("DELETE FROM data_points WHERE tag_id = ?1", [id])?;
        let removed = tx.execute(
            "DELETE FROM tags WHERE id = ?1 AND collection_id = ?2",
            [id, collection_id],
        )?;

        if removed == 0 {
            return Err(Error::NotFound(format!("tag with id {}", id)));
        }

        tracing::debug!(id, data_points, "deleted tag");
        Ok(())
    }

    /// Data points under this tag
    pub fn list_data_points(&self, conn: &Connection) -> Result<Vec<DataPoint>> {
        DataPoint::list_for_tag(conn, &self.id)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            collection_id: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::storage::Database;

    fn count_data_points(conn: &Connection, tag_id: &str) -> usize {
        DataPoint::list_for_tag(conn, tag_id).unwrap().len()
    }

    fn delete_in_tx(conn: &mut Connection, id: &str, collection_id: &str) -> Result<()> {
        let tx = conn.transaction()?;
        Tag::delete_by_id(&tx, id, collection_id)?;
        tx.commit()?;
        Ok(())
    }

    #[test]
    fn test_tag_crud() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let collection = Collection::create(conn, "c")?;
            let mut tag = Tag::create(conn, &collection.id, "draft")?;

            assert_eq!(Tag::get(conn, &tag.id, &collection.id)?, tag);

            tag.update(conn, "published")?;
            let stored = Tag::get(conn, &tag.id, &collection.id)?;
            assert_eq!(stored.name, "published");
            assert!(stored.updated_at > stored.created_at);

            let tx = conn.transaction()?;
            tag.delete(&tx)?;
            tx.commit()?;
            assert!(matches!(
                Tag::get(conn, &tag.id, &collection.id),
                Err(Error::NotFound(_))
            ));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_create_requires_collection() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let err = Tag::create(conn, "no-such-collection", "orphan").unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_created_tag_listed_once() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let collection = Collection::create(conn, "c")?;
            Tag::create(conn, &collection.id, "first")?;
            let tag = Tag::create(conn, &collection.id, "second")?;

            let tags = collection.list_tags(conn)?;
            assert_eq!(tags.len(), 2);
            assert_eq!(tags.iter().filter(|t| t.id == tag.id).count(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_get_is_scoped_to_collection() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let a = Collection::create(conn, "a")?;
            let b = Collection::create(conn, "b")?;
            let tag = Tag::create(conn, &a.id, "t")?;

            assert!(matches!(Tag::get(conn, &tag.id, &b.id), Err(Error::NotFound(_))));

            let mut wrong_owner = tag.clone();
            wrong_owner.collection_id = b.id.clone();
            assert!(matches!(wrong_owner.update(conn, "x"), Err(Error::NotFound(_))));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_delete_removes_data_points() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let collection = Collection::create(conn, "c")?;
            let tag = Tag::create(conn, &collection.id, "t")?;
            DataPoint::create(conn, &tag.id, "one")?;
            DataPoint::create(conn, &tag.id, "two")?;
            assert_eq!(tag.list_data_points(conn)?.len(), 2);

            delete_in_tx(conn, &tag.id, &collection.id)?;
            assert_eq!(count_data_points(conn, &tag.id), 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_delete_missing_tag_leaves_others_untouched() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let collection = Collection::create(conn, "c")?;
            let keep = Tag::create(conn, &collection.id, "keep")?;
            DataPoint::create(conn, &keep.id, "kept")?;

            let err = delete_in_tx(conn, "missing", &collection.id).unwrap_err();
            assert!(matches!(err, Error::NotFound(_)));
            assert_eq!(count_data_points(conn, &keep.id), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_delete_under_wrong_collection_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = Collection::create(conn, "owner")?;
            let other = Collection::create(conn, "other")?;
            let tag = Tag::create(conn, &owner.id, "t")?;
            DataPoint::create(conn, &tag.id, "survives")?;

            // The data point delete matches, the tag delete does not
            let err = delete_in_tx(conn, &tag.id, &other.id).unwrap_err();
            assert!(matches!(err, Error::NotFound(_)));
            assert_eq!(count_data_points(conn, &tag.id), 1);
            assert!(Tag::get(conn, &tag.id, &owner.id).is_ok());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_failed_tag_row_delete_restores_data_points() {
        let db = Database::open_in_memory().unwrap();
        let (collection, tag) = db
            .with_conn(|conn| {
                let collection = Collection::create(conn, "c")?;
                let tag = Tag::create(conn, &collection.id, "t")?;
                DataPoint::create(conn, &tag.id, "one")?;
                DataPoint::create(conn, &tag.id, "two")?;
                conn.execute_batch(
                    "CREATE TRIGGER block_tag_delete BEFORE DELETE ON tags
                     BEGIN SELECT RAISE(ABORT, 'tag delete blocked'); END;",
                )?;
                Ok((collection, tag))
            })
            .unwrap();

        let err = db
            .transaction(|tx| Tag::delete_by_id(tx, &tag.id, &collection.id))
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        db.with_conn(|conn| {
            assert_eq!(count_data_points(conn, &tag.id), 2);
            assert!(Tag::get(conn, &tag.id, &collection.id).is_ok());
            Ok(())
        })
        .unwrap();
    }
}
