// SPDX-License-Identifier: MPL-2.0

use crate::backend::{Plan, Profile, ProfileRow, ProfileUpdate};
use crate::store::db::{Db, format_ts, parse_ts};
use crate::store::StoreError;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};

/// Values for a freshly created profile
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: String,
    pub email: Option<String>,
    pub username: String,
    pub bio: Option<String>,
    pub plan: Plan,
}

impl NewProfile {
    pub fn new(id: &str, username: &str) -> Self {
        Self {
            id: id.to_string(),
            email: None,
            username: username.to_string(),
            bio: None,
            plan: Plan::Free,
        }
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

/// Row operations on `profiles`
pub struct ProfileTable<'a> {
    db: &'a Db,
}

impl<'a> ProfileTable<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    pub fn insert(&self, profile: &NewProfile) -> Result<(), StoreError> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO profiles (id, email, username, bio, plan, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                profile.id,
                profile.email,
                profile.username,
                profile.bio,
                profile.plan.as_str(),
                format_ts(Utc::now()),
            ],
        )
        .map_err(StoreError::from_write)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Profile, StoreError> {
        let conn = self.db.conn();

        let mut stmt = conn.prepare(
            r#"
            SELECT
                id, username, bio, avatar_url, plan,
                packs_count, followers_count, total_likes_received,
                total_sales, total_plays_count, created_at
            FROM profiles
            WHERE id = ?
            "#,
        )?;

        let row = stmt
            .query_row([id], |row| {
                Ok(ProfileRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    bio: row.get(2)?,
                    avatar_url: row.get(3)?,
                    plan: row.get(4)?,
                    packs_count: row.get(5)?,
                    followers_count: row.get(6)?,
                    total_likes_received: row.get(7)?,
                    total_sales: row.get(8)?,
                    total_plays_count: row.get(9)?,
                    created_at: parse_ts(row.get(10)?),
                })
            })
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Database(other),
            })?;

        Ok(Profile::from(row))
    }

    pub fn email(&self, id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.db.conn();
        let email: Option<Option<String>> = conn
            .query_row("SELECT email FROM profiles WHERE id = ?", [id], |row| {
                row.get(0)
            })
            .optional()?;
        email.ok_or(StoreError::NotFound)
    }

    pub fn id_by_username(&self, username: &str) -> Result<Option<String>, StoreError> {
        let conn = self.db.conn();
        let id = conn
            .query_row(
                "SELECT id FROM profiles WHERE username = ? LIMIT 1",
                [username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn update(&self, id: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
        let conn = self.db.conn();
        let changed = conn
            .execute(
                "UPDATE profiles SET username = ?1, bio = ?2, avatar_url = ?3 WHERE id = ?4",
                params![update.username, update.bio, update.avatar_url, id],
            )
            .map_err(StoreError::from_write)?;

        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn set_packs_count(&self, id: &str, packs_count: i64) -> Result<(), StoreError> {
        let conn = self.db.conn();
        conn.execute(
            "UPDATE profiles SET packs_count = ?1 WHERE id = ?2",
            params![packs_count, id],
        )?;
        Ok(())
    }

    pub fn set_plan(&self, id: &str, plan: Plan) -> Result<(), StoreError> {
        let conn = self.db.conn();
        conn.execute(
            "UPDATE profiles SET plan = ?1 WHERE id = ?2",
            params![plan.as_str(), id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let db = Db::open_in_memory().unwrap();
        let table = ProfileTable::new(&db);
        table
            .insert(&NewProfile::new("u1", "beatmaker").with_plan(Plan::Pro))
            .unwrap();

        let profile = table.get("u1").unwrap();
        assert_eq!(profile.username, "beatmaker");
        assert_eq!(profile.plan, Plan::Pro);
        assert_eq!(profile.packs_count, 0);
        assert!(profile.created_at.is_some());
        assert!(matches!(table.get("missing"), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_update_to_taken_username_conflicts() {
        let db = Db::open_in_memory().unwrap();
        let table = ProfileTable::new(&db);
        table.insert(&NewProfile::new("u1", "alpha")).unwrap();
        table.insert(&NewProfile::new("u2", "beta")).unwrap();

        let update = ProfileUpdate {
            username: "alpha".to_string(),
            bio: None,
            avatar_url: None,
        };
        assert!(matches!(
            table.update("u2", &update),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(table.id_by_username("alpha").unwrap().as_deref(), Some("u1"));
        assert_eq!(table.id_by_username("gamma").unwrap(), None);
    }
}
