// SPDX-License-Identifier: MPL-2.0

use crate::backend::{BackendError, DataStore, Plan};
use crate::profile::{Entitlements, Quota};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub quota: Quota,
    /// `None` when the procedure returned nothing or failed.
    pub remaining: Option<i64>,
}

impl QuotaStatus {
    /// A limited quota with nothing left.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.quota, Quota::Limited(limit) if limit > 0) && self.remaining == Some(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitsCard {
    pub plan: Plan,
    pub downloads: QuotaStatus,
    pub uploads: QuotaStatus,
}

impl LimitsCard {
    pub async fn load(data: &dyn DataStore, user_id: &str, plan: Plan) -> Self {
        let entitlements = Entitlements::for_plan(plan);
        let (downloads, uploads) = tokio::join!(
            data.remaining_downloads(user_id),
            data.remaining_uploads(user_id)
        );

        Self {
            plan,
            downloads: QuotaStatus {
                quota: entitlements.downloads,
                remaining: fail_open("get_remaining_downloads", downloads),
            },
            uploads: QuotaStatus {
                quota: entitlements.uploads,
                remaining: fail_open("get_remaining_uploads", uploads),
            },
        }
    }

    pub fn show_upgrade(&self) -> bool {
        Entitlements::for_plan(self.plan).upgrade_cta
            && (self.downloads.is_exhausted() || self.uploads.is_exhausted())
    }
}

fn fail_open(procedure: &str, result: Result<Option<i64>, BackendError>) -> Option<i64> {
    result.unwrap_or_else(|e| {
        warn!(target: "arsound::limits", procedure, error = %e, "quota lookup failed");
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use crate::store::{NewPack, NewProfile, PackTable, ProfileTable};

    #[tokio::test]
    async fn test_upgrade_shown_when_free_uploads_exhausted() {
        let backend = RecordingBackend::new();
        let db = backend.local().db();
        ProfileTable::new(db).insert(&NewProfile::new("u1", "maker")).unwrap();
        PackTable::new(db).insert(&NewPack::new("p1", "u1", "One")).unwrap();
        PackTable::new(db).insert(&NewPack::new("p2", "u1", "Two")).unwrap();

        let card = LimitsCard::load(backend.as_ref(), "u1", Plan::Free).await;
        assert_eq!(card.uploads.remaining, Some(0));
        assert_eq!(card.downloads.remaining, Some(10));
        assert!(card.show_upgrade());
    }

    #[tokio::test]
    async fn test_failures_degrade_to_unknown() {
        let backend = RecordingBackend::new();
        ProfileTable::new(backend.local().db())
            .insert(&NewProfile::new("u1", "maker"))
            .unwrap();
        backend.fail("remaining_downloads");
        backend.fail("remaining_uploads");

        let card = LimitsCard::load(backend.as_ref(), "u1", Plan::Free).await;
        assert_eq!(card.downloads.remaining, None);
        assert_eq!(card.uploads.remaining, None);
        assert!(!card.show_upgrade());
    }

    #[test]
    fn test_pro_never_shows_upgrade() {
        let card = LimitsCard {
            plan: Plan::Pro,
            downloads: QuotaStatus {
                quota: Quota::Unlimited,
                remaining: Some(0),
            },
            uploads: QuotaStatus {
                quota: Quota::Unlimited,
                remaining: None,
            },
        };
        assert!(!card.show_upgrade());
    }
}
