// SPDX-License-Identifier: MPL-2.0

//! Collections scoped to a loaded profile: owned packs and liked packs.
//!
//! Read failures are logged and degrade to an empty collection. The view
//! then shows its empty state instead of an error.

use crate::backend::{DataStore, LikedPack, Pack, Profile};
use tracing::{info, warn};

/// All packs owned by `profile`, newest first.
///
/// When the fetched count differs from the stored `packs_count`, the stored
/// counter is corrected. The correction is a plain overwrite; concurrent
/// writers may race.
pub async fn load_owned_packs(data: &dyn DataStore, profile: &Profile) -> Vec<Pack> {
    let packs = match data.packs_by_owner(&profile.id).await {
        Ok(packs) => packs,
        Err(e) => {
            warn!(target: "arsound::collections", user = %profile.id, error = %e, "failed to load packs");
            return Vec::new();
        }
    };

    let actual = packs.len() as i64;
    if actual != profile.packs_count {
        match data.update_packs_count(&profile.id, actual).await {
            Ok(()) => info!(
                target: "arsound::collections",
                user = %profile.id,
                stored = profile.packs_count,
                actual,
                "corrected packs_count"
            ),
            Err(e) => warn!(
                target: "arsound::collections",
                user = %profile.id,
                error = %e,
                "failed to correct packs_count"
            ),
        }
    }

    packs
}

/// All likes by `user_id` with their joined pack, newest first. Rows whose
/// pack is gone are kept; the view decides what to show.
pub async fn load_liked_packs(data: &dyn DataStore, user_id: &str) -> Vec<LikedPack> {
    match data.likes_by_user(user_id).await {
        Ok(likes) => likes,
        Err(e) => {
            warn!(target: "arsound::collections", user = %user_id, error = %e, "failed to load liked packs");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OwnedPacksView {
    Loading,
    Empty,
    Grid(Vec<Pack>),
}

impl OwnedPacksView {
    pub fn from_packs(packs: Option<&[Pack]>) -> Self {
        match packs {
            None => OwnedPacksView::Loading,
            Some([]) => OwnedPacksView::Empty,
            Some(packs) => OwnedPacksView::Grid(packs.to_vec()),
        }
    }

    pub fn empty_message() -> &'static str {
        "Upload your first pack"
    }
}

/// Exactly one of these holds for any snapshot of the liked-packs section.
#[derive(Debug, Clone, PartialEq)]
pub enum LikedPacksView {
    Loading,
    /// At least one liked pack still exists and is not deleted.
    Grid(Vec<Pack>),
    /// Likes exist, but every referenced pack is gone or deleted.
    AllRemoved,
    NoLikes,
}

impl LikedPacksView {
    pub fn from_likes(likes: Option<&[LikedPack]>) -> Self {
        let Some(likes) = likes else {
            return LikedPacksView::Loading;
        };

        let visible: Vec<Pack> = likes
            .iter()
            .filter_map(LikedPack::visible_pack)
            .cloned()
            .collect();

        if !visible.is_empty() {
            LikedPacksView::Grid(visible)
        } else if likes.is_empty() {
            LikedPacksView::NoLikes
        } else {
            LikedPacksView::AllRemoved
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            LikedPacksView::AllRemoved => Some("Your liked packs were removed"),
            LikedPacksView::NoLikes => Some("No liked packs yet"),
            LikedPacksView::Loading | LikedPacksView::Grid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use crate::store::{NewPack, NewProfile, PackTable, ProfileTable};
    use chrono::Utc;

    fn liked(pack_id: &str, pack: Option<(&str, bool)>) -> LikedPack {
        LikedPack {
            pack_id: pack_id.to_string(),
            liked_at: None,
            pack: pack.map(|(title, is_deleted)| Pack {
                id: pack_id.to_string(),
                owner_id: "seller".to_string(),
                title: title.to_string(),
                price: 0,
                cover_url: None,
                downloads_count: 0,
                likes_count: 0,
                genre: None,
                is_deleted,
                created_at: None,
            }),
        }
    }

    #[test]
    fn test_liked_view_partitions() {
        assert_eq!(LikedPacksView::from_likes(None), LikedPacksView::Loading);
        assert_eq!(LikedPacksView::from_likes(Some(&[][..])), LikedPacksView::NoLikes);

        let removed = vec![liked("a", None), liked("b", Some(("Old", true)))];
        let view = LikedPacksView::from_likes(Some(removed.as_slice()));
        assert_eq!(view, LikedPacksView::AllRemoved);
        assert_eq!(view.message(), Some("Your liked packs were removed"));

        let mixed = vec![liked("a", None), liked("c", Some(("Live", false)))];
        match LikedPacksView::from_likes(Some(mixed.as_slice())) {
            LikedPacksView::Grid(packs) => {
                assert_eq!(packs.len(), 1);
                assert_eq!(packs[0].title, "Live");
            }
            other => panic!("expected grid, got {other:?}"),
        }
    }

    #[test]
    fn test_owned_view_states() {
        assert_eq!(OwnedPacksView::from_packs(None), OwnedPacksView::Loading);
        assert_eq!(OwnedPacksView::from_packs(Some(&[][..])), OwnedPacksView::Empty);
    }

    #[tokio::test]
    async fn test_packs_count_is_corrected() {
        let backend = RecordingBackend::new();
        let db = backend.local().db();
        ProfileTable::new(db).insert(&NewProfile::new("u1", "maker")).unwrap();
        PackTable::new(db).insert(&NewPack::new("p1", "u1", "One")).unwrap();
        PackTable::new(db).insert(&NewPack::new("p2", "u1", "Two")).unwrap();

        let profile = ProfileTable::new(db).get("u1").unwrap();
        let packs = load_owned_packs(backend.as_ref(), &profile).await;
        assert_eq!(packs.len(), 2);
        assert_eq!(ProfileTable::new(db).get("u1").unwrap().packs_count, 2);

        let refreshed = ProfileTable::new(db).get("u1").unwrap();
        load_owned_packs(backend.as_ref(), &refreshed).await;
        assert_eq!(backend.calls("update_packs_count"), 1);
    }

    #[tokio::test]
    async fn test_read_failures_degrade_to_empty() {
        let backend = RecordingBackend::new();
        let db = backend.local().db();
        ProfileTable::new(db).insert(&NewProfile::new("u1", "maker")).unwrap();
        PackTable::new(db).insert(&NewPack::new("p1", "u1", "One")).unwrap();
        PackTable::new(db).like("u1", "p1", Utc::now()).unwrap();
        backend.fail("packs_by_owner");
        backend.fail("likes_by_user");

        let profile = ProfileTable::new(db).get("u1").unwrap();
        assert!(load_owned_packs(backend.as_ref(), &profile).await.is_empty());
        assert!(load_liked_packs(backend.as_ref(), "u1").await.is_empty());
        assert_eq!(backend.calls("update_packs_count"), 0);
    }
}
