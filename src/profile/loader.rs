// SPDX-License-Identifier: MPL-2.0

use crate::backend::{DataStore, Profile};
use crate::config::FALLBACK_DISPLAY_NAME;
use tracing::{debug, warn};

/// Fetch the profile row for `id`. Absence and failures both yield `None`;
/// the view falls back to placeholder values.
pub async fn load_profile(data: &dyn DataStore, id: &str) -> Option<Profile> {
    match data.profile(id).await {
        Ok(Some(profile)) => {
            debug!(target: "arsound::profile", user = %id, plan = %profile.plan, "profile loaded");
            Some(profile)
        }
        Ok(None) => {
            warn!(target: "arsound::profile", user = %id, "profile not found");
            None
        }
        Err(e) => {
            warn!(target: "arsound::profile", user = %id, error = %e, "failed to load profile");
            None
        }
    }
}

pub fn display_name(profile: Option<&Profile>) -> &str {
    profile
        .map(|p| p.username.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_DISPLAY_NAME)
}

pub fn display_bio(profile: Option<&Profile>) -> &str {
    profile.and_then(|p| p.bio.as_deref()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use crate::store::{NewProfile, ProfileTable};

    #[tokio::test]
    async fn test_missing_profile_uses_placeholders() {
        let backend = RecordingBackend::new();
        let profile = load_profile(backend.as_ref(), "nobody").await;
        assert!(profile.is_none());
        assert_eq!(display_name(profile.as_ref()), "Usuario");
        assert_eq!(display_bio(profile.as_ref()), "");
    }

    #[tokio::test]
    async fn test_failure_leaves_profile_unset() {
        let backend = RecordingBackend::new();
        ProfileTable::new(backend.local().db())
            .insert(&NewProfile::new("u1", "maker"))
            .unwrap();
        backend.fail("profile");
        assert!(load_profile(backend.as_ref(), "u1").await.is_none());
    }

    #[tokio::test]
    async fn test_loads_existing_profile() {
        let backend = RecordingBackend::new();
        ProfileTable::new(backend.local().db())
            .insert(&NewProfile::new("u1", "maker"))
            .unwrap();
        let profile = load_profile(backend.as_ref(), "u1").await;
        assert_eq!(display_name(profile.as_ref()), "maker");
    }
}
