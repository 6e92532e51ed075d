// SPDX-License-Identifier: MPL-2.0

use crate::store::db::{Db, format_ts};
use crate::store::StoreError;
use chrono::Utc;
use rusqlite::params;

/// Stored object with metadata
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Blob storage in the `objects` table
pub struct ObjectTable<'a> {
    db: &'a Db,
}

impl<'a> ObjectTable<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    pub fn put(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        data: &[u8],
        upsert: bool,
    ) -> Result<(), StoreError> {
        let conn = self.db.conn();
        let sql = if upsert {
            r#"
            INSERT INTO objects (bucket, path, content_type, data, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(bucket, path) DO UPDATE SET
                content_type = excluded.content_type,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#
        } else {
            r#"
            INSERT INTO objects (bucket, path, content_type, data, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#
        };

        conn.execute(
            sql,
            params![bucket, path, content_type, data, format_ts(Utc::now())],
        )
        .map_err(StoreError::from_write)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, bucket: &str, path: &str) -> Result<Option<StoredObject>, StoreError> {
        use rusqlite::OptionalExtension;

        let conn = self.db.conn();
        let object = conn
            .query_row(
                "SELECT content_type, data FROM objects WHERE bucket = ?1 AND path = ?2",
                params![bucket, path],
                |row| {
                    Ok(StoredObject {
                        content_type: row.get(0)?,
                        data: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(object)
    }

    pub fn delete(&self, bucket: &str, path: &str) -> Result<(), StoreError> {
        let conn = self.db.conn();
        let removed = conn.execute(
            "DELETE FROM objects WHERE bucket = ?1 AND path = ?2",
            params![bucket, path],
        )?;
        if removed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn count(&self, bucket: &str) -> Result<i64, StoreError> {
        let conn = self.db.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM objects WHERE bucket = ?",
            [bucket],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_without_upsert_rejects_existing() {
        let db = Db::open_in_memory().unwrap();
        let objects = ObjectTable::new(&db);
        objects.put("avatars", "u1/a.png", "image/png", b"one", false).unwrap();
        assert!(matches!(
            objects.put("avatars", "u1/a.png", "image/png", b"two", false),
            Err(StoreError::Conflict(_))
        ));

        objects.put("avatars", "u1/a.png", "image/png", b"two", true).unwrap();
        let stored = objects.get("avatars", "u1/a.png").unwrap().unwrap();
        assert_eq!(stored.data, b"two");
        assert_eq!(objects.count("avatars").unwrap(), 1);
    }

    #[test]
    fn test_delete_missing_object() {
        let db = Db::open_in_memory().unwrap();
        let objects = ObjectTable::new(&db);
        assert!(matches!(
            objects.delete("avatars", "nope"),
            Err(StoreError::NotFound)
        ));
    }
}
