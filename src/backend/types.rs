// SPDX-License-Identifier: MPL-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated principal, distinct from its public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

/// Subscription tier. Unknown identifiers normalize to `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Plus,
    Pro,
}

impl Plan {
    pub fn from_identifier(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("plus") => Plan::Plus,
            Some("pro") => Plan::Pro,
            _ => Plan::Free,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Plus => "plus",
            Plan::Pro => "pro",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile row as the backend returns it. Every column but `id` may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub plan: Option<String>,
    pub packs_count: Option<i64>,
    pub followers_count: Option<i64>,
    pub total_likes_received: Option<i64>,
    pub total_sales: Option<i64>,
    pub total_plays_count: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub plan: Plan,
    pub packs_count: i64,
    pub followers_count: i64,
    pub total_likes_received: i64,
    pub total_sales: i64,
    pub total_plays_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            username: row.username.unwrap_or_default(),
            bio: non_empty(row.bio),
            avatar_url: non_empty(row.avatar_url),
            plan: Plan::from_identifier(row.plan.as_deref()),
            packs_count: row.packs_count.unwrap_or(0),
            followers_count: row.followers_count.unwrap_or(0),
            total_likes_received: row.total_likes_received.unwrap_or(0),
            total_sales: row.total_sales.unwrap_or(0),
            total_plays_count: row.total_plays_count.unwrap_or(0),
            created_at: row.created_at,
        }
    }
}

/// Fields written by a profile save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackRow {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub price: Option<i64>,
    pub cover_url: Option<String>,
    pub downloads_count: Option<i64>,
    pub likes_count: Option<i64>,
    pub genre: Option<String>,
    pub is_deleted: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pack {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    /// Whole currency units; 0 means free.
    pub price: u64,
    pub cover_url: Option<String>,
    pub downloads_count: i64,
    pub likes_count: i64,
    pub genre: Option<String>,
    pub is_deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Pack {
    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}

impl From<PackRow> for Pack {
    fn from(row: PackRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.user_id,
            title: row.title.unwrap_or_default(),
            price: row.price.unwrap_or(0).max(0) as u64,
            cover_url: non_empty(row.cover_url),
            downloads_count: row.downloads_count.unwrap_or(0),
            likes_count: row.likes_count.unwrap_or(0),
            genre: non_empty(row.genre),
            is_deleted: row.is_deleted.unwrap_or(false),
            created_at: row.created_at,
        }
    }
}

/// A like row with its joined pack, as returned by the embedded select.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeRow {
    pub pack_id: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "packs")]
    pub pack: Option<PackRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikedPack {
    pub pack_id: String,
    pub liked_at: Option<DateTime<Utc>>,
    /// `None` when the referenced pack no longer exists.
    pub pack: Option<Pack>,
}

impl LikedPack {
    /// The joined pack, if it still exists and is not soft-deleted.
    pub fn visible_pack(&self) -> Option<&Pack> {
        self.pack.as_ref().filter(|p| !p.is_deleted)
    }
}

impl From<LikeRow> for LikedPack {
    fn from(row: LikeRow) -> Self {
        Self {
            pack_id: row.pack_id,
            liked_at: row.created_at,
            pack: row.pack.map(Pack::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayEvent {
    pub pack_id: String,
    pub played_at: DateTime<Utc>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_normalization() {
        assert_eq!(Plan::from_identifier(Some("pro")), Plan::Pro);
        assert_eq!(Plan::from_identifier(Some(" PLUS ")), Plan::Plus);
        assert_eq!(Plan::from_identifier(Some("enterprise")), Plan::Free);
        assert_eq!(Plan::from_identifier(None), Plan::Free);
    }

    #[test]
    fn test_profile_row_defaults() {
        let row: ProfileRow = serde_json::from_str(r#"{"id":"u1","bio":"  ","plan":null}"#).unwrap();
        let profile = Profile::from(row);
        assert_eq!(profile.username, "");
        assert_eq!(profile.bio, None);
        assert_eq!(profile.avatar_url, None);
        assert_eq!(profile.plan, Plan::Free);
        assert_eq!(profile.packs_count, 0);
    }

    #[test]
    fn test_like_row_with_missing_pack() {
        let row: LikeRow =
            serde_json::from_str(r#"{"pack_id":"p1","created_at":null,"packs":null}"#).unwrap();
        let like = LikedPack::from(row);
        assert!(like.pack.is_none());
        assert!(like.visible_pack().is_none());
    }

    #[test]
    fn test_like_row_with_deleted_pack_is_hidden() {
        let row: LikeRow = serde_json::from_str(
            r#"{"pack_id":"p1","packs":{"id":"p1","user_id":"u2","title":"Drums","is_deleted":true}}"#,
        )
        .unwrap();
        let like = LikedPack::from(row);
        assert!(like.pack.is_some());
        assert!(like.visible_pack().is_none());
    }
}
