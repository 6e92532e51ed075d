// SPDX-License-Identifier: MPL-2.0

//! Packs and the fact tables hanging off them: likes, plays, downloads.

use crate::backend::{LikedPack, Pack, PackRow, PlayEvent};
use crate::store::db::{Db, format_ts, parse_ts};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params, params_from_iter};

const PACK_COLUMNS: &str = "id, user_id, title, price, cover_url, downloads_count, likes_count, genre, is_deleted, created_at";

#[derive(Debug, Clone)]
pub struct NewPack {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub price: u64,
    pub genre: Option<String>,
    pub downloads_count: i64,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
}

impl NewPack {
    pub fn new(id: &str, owner_id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            price: 0,
            genre: None,
            downloads_count: 0,
            likes_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_counts(mut self, downloads: i64, likes: i64) -> Self {
        self.downloads_count = downloads;
        self.likes_count = likes;
        self
    }

    pub fn with_price(mut self, price: u64) -> Self {
        self.price = price;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }
}

/// Map a row selected with `PACK_COLUMNS` starting at `offset`.
fn pack_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<PackRow> {
    Ok(PackRow {
        id: row.get(offset)?,
        user_id: row.get(offset + 1)?,
        title: row.get(offset + 2)?,
        price: row.get(offset + 3)?,
        cover_url: row.get(offset + 4)?,
        downloads_count: row.get(offset + 5)?,
        likes_count: row.get(offset + 6)?,
        genre: row.get(offset + 7)?,
        is_deleted: row.get(offset + 8)?,
        created_at: parse_ts(row.get(offset + 9)?),
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Row operations on `packs`, `pack_likes`, `pack_plays` and `pack_downloads`
pub struct PackTable<'a> {
    db: &'a Db,
}

impl<'a> PackTable<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    pub fn insert(&self, pack: &NewPack) -> Result<(), StoreError> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO packs (id, user_id, title, price, genre, downloads_count, likes_count, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                pack.id,
                pack.owner_id,
                pack.title,
                pack.price as i64,
                pack.genre,
                pack.downloads_count,
                pack.likes_count,
                format_ts(pack.created_at),
            ],
        )
        .map_err(StoreError::from_write)?;
        Ok(())
    }

    pub fn soft_delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.db.conn();
        conn.execute("UPDATE packs SET is_deleted = 1 WHERE id = ?", [id])?;
        Ok(())
    }

    pub fn by_owner(&self, owner_id: &str) -> Result<Vec<Pack>, StoreError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PACK_COLUMNS} FROM packs WHERE user_id = ? ORDER BY created_at DESC"
        ))?;

        let packs = stmt
            .query_map([owner_id], |row| pack_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(Pack::from)
            .collect();
        Ok(packs)
    }

    pub fn created_since(&self, owner_id: &str, since: DateTime<Utc>) -> Result<i64, StoreError> {
        let conn = self.db.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM packs WHERE user_id = ?1 AND created_at >= ?2",
            params![owner_id, format_ts(since)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn like(&self, user_id: &str, pack_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR REPLACE INTO pack_likes (user_id, pack_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, pack_id, format_ts(at)],
        )?;
        Ok(())
    }

    /// Likes with their pack left-joined, newest first
    pub fn likes_by_user(&self, user_id: &str) -> Result<Vec<LikedPack>, StoreError> {
        let conn = self.db.conn();
        let columns = PACK_COLUMNS
            .split(", ")
            .map(|c| format!("p.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT l.pack_id, l.created_at, {columns}
            FROM pack_likes l
            LEFT JOIN packs p ON p.id = l.pack_id
            WHERE l.user_id = ?
            ORDER BY l.created_at DESC
            "#
        ))?;

        let likes = stmt
            .query_map([user_id], |row| {
                let joined_id: Option<String> = row.get(2)?;
                let pack = match joined_id {
                    Some(_) => Some(Pack::from(pack_row(row, 2)?)),
                    None => None,
                };
                Ok(LikedPack {
                    pack_id: row.get(0)?,
                    liked_at: parse_ts(row.get(1)?),
                    pack,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(likes)
    }

    pub fn record_play(&self, pack_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO pack_plays (pack_id, played_at) VALUES (?1, ?2)",
            params![pack_id, format_ts(at)],
        )?;
        Ok(())
    }

    /// Plays of `pack_ids` at or after `since`, oldest first
    pub fn plays_since(
        &self,
        pack_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<PlayEvent>, StoreError> {
        if pack_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT pack_id, played_at FROM pack_plays
            WHERE pack_id IN ({}) AND played_at >= ?
            ORDER BY played_at ASC
            "#,
            placeholders(pack_ids.len())
        ))?;

        let since = format_ts(since);
        let args = pack_ids.iter().map(String::as_str).chain(std::iter::once(since.as_str()));

        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(pack_id, played_at)| {
                parse_ts(Some(played_at)).map(|played_at| PlayEvent { pack_id, played_at })
            })
            .collect())
    }

    pub fn record_download(
        &self,
        user_id: &str,
        pack_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO pack_downloads (user_id, pack_id, downloaded_at) VALUES (?1, ?2, ?3)",
            params![user_id, pack_id, format_ts(at)],
        )?;
        Ok(())
    }

    pub fn downloads_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<i64, StoreError> {
        let conn = self.db.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM pack_downloads WHERE user_id = ?1 AND downloaded_at >= ?2",
            params![user_id, format_ts(since)],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_by_owner_newest_first() {
        let db = Db::open_in_memory().unwrap();
        let packs = PackTable::new(&db);
        let now = Utc::now();
        packs
            .insert(&NewPack::new("old", "u1", "Old").created_at(now - Duration::days(3)))
            .unwrap();
        packs.insert(&NewPack::new("new", "u1", "New").created_at(now)).unwrap();
        packs.insert(&NewPack::new("other", "u2", "Other")).unwrap();

        let owned = packs.by_owner("u1").unwrap();
        let ids: Vec<&str> = owned.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_likes_left_join_keeps_missing_packs() {
        let db = Db::open_in_memory().unwrap();
        let packs = PackTable::new(&db);
        let now = Utc::now();
        packs.insert(&NewPack::new("p1", "u2", "Kept")).unwrap();
        packs.insert(&NewPack::new("p2", "u2", "Deleted")).unwrap();
        packs.soft_delete("p2").unwrap();
        packs.like("u1", "p1", now - Duration::hours(2)).unwrap();
        packs.like("u1", "p2", now - Duration::hours(1)).unwrap();
        packs.like("u1", "gone", now).unwrap();

        let likes = packs.likes_by_user("u1").unwrap();
        assert_eq!(likes.len(), 3);
        assert_eq!(likes[0].pack_id, "gone");
        assert!(likes[0].pack.is_none());
        assert!(likes[1].pack.as_ref().unwrap().is_deleted);
        assert_eq!(likes[2].visible_pack().unwrap().title, "Kept");
    }

    #[test]
    fn test_plays_since_filters_window_and_packs() {
        let db = Db::open_in_memory().unwrap();
        let packs = PackTable::new(&db);
        let now = Utc::now();
        packs.record_play("p1", now - Duration::days(40)).unwrap();
        packs.record_play("p1", now - Duration::days(2)).unwrap();
        packs.record_play("p2", now - Duration::days(1)).unwrap();
        packs.record_play("p3", now).unwrap();

        let ids = vec!["p1".to_string(), "p2".to_string()];
        let plays = packs.plays_since(&ids, now - Duration::days(30)).unwrap();
        assert_eq!(plays.len(), 2);
        assert_eq!(plays[0].pack_id, "p1");
        assert_eq!(plays[1].pack_id, "p2");
    }
}
