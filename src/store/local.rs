// SPDX-License-Identifier: MPL-2.0

use crate::backend::{
    AuthProvider, BackendError, DataStore, Identity, LikedPack, ObjectStore, Pack, PlayEvent,
    Profile, ProfileUpdate,
};
use crate::profile::{Entitlements, Quota};
use crate::store::{Db, ObjectTable, PackTable, ProfileTable, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tokio::sync::watch;
use tracing::debug;

const PUBLIC_URL_PREFIX: &str = "local://objects/";

/// Local database acting as auth provider, row store and object store.
pub struct LocalStore {
    db: Db,
    auth_state: watch::Sender<Option<Identity>>,
}

impl LocalStore {
    pub fn new(db: Db) -> Self {
        let (auth_state, _) = watch::channel(None);
        Self { db, auth_state }
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Db::open_in_memory()?))
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Start a session for an existing profile.
    pub fn sign_in(&self, user_id: &str) -> Result<Identity, StoreError> {
        let email = ProfileTable::new(&self.db).email(user_id)?;
        let identity = Identity {
            id: user_id.to_string(),
            email,
        };
        self.auth_state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or(now)
    }

    /// `quota` minus `used`, floored at zero. `None` when unlimited.
    fn remaining(quota: Quota, used: i64) -> Option<i64> {
        match quota {
            Quota::Limited(limit) => Some((i64::from(limit) - used).max(0)),
            Quota::Unlimited => None,
        }
    }

    fn entitlements_of(&self, user_id: &str) -> Result<Option<Entitlements>, StoreError> {
        match ProfileTable::new(&self.db).get(user_id) {
            Ok(profile) => Ok(Some(Entitlements::for_plan(profile.plan))),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AuthProvider for LocalStore {
    async fn current_user(&self) -> Result<Option<Identity>, BackendError> {
        Ok(self.auth_state.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.auth_state.subscribe()
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.auth_state.send_replace(None);
        Ok(())
    }
}

#[async_trait]
impl DataStore for LocalStore {
    async fn profile(&self, id: &str) -> Result<Option<Profile>, BackendError> {
        match ProfileTable::new(&self.db).get(id) {
            Ok(profile) => Ok(Some(profile)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), BackendError> {
        ProfileTable::new(&self.db).update(id, update)?;
        Ok(())
    }

    async fn update_packs_count(&self, id: &str, packs_count: i64) -> Result<(), BackendError> {
        ProfileTable::new(&self.db).set_packs_count(id, packs_count)?;
        Ok(())
    }

    async fn profile_id_by_username(
        &self,
        username: &str,
    ) -> Result<Option<String>, BackendError> {
        Ok(ProfileTable::new(&self.db).id_by_username(username)?)
    }

    async fn packs_by_owner(&self, owner_id: &str) -> Result<Vec<Pack>, BackendError> {
        Ok(PackTable::new(&self.db).by_owner(owner_id)?)
    }

    async fn likes_by_user(&self, user_id: &str) -> Result<Vec<LikedPack>, BackendError> {
        Ok(PackTable::new(&self.db).likes_by_user(user_id)?)
    }

    async fn plays_since(
        &self,
        pack_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<PlayEvent>, BackendError> {
        Ok(PackTable::new(&self.db).plays_since(pack_ids, since)?)
    }

    async fn remaining_downloads(&self, user_id: &str) -> Result<Option<i64>, BackendError> {
        let Some(entitlements) = self.entitlements_of(user_id)? else {
            return Ok(None);
        };
        let since = Self::month_start(Utc::now());
        let used = PackTable::new(&self.db).downloads_since(user_id, since)?;
        Ok(Self::remaining(entitlements.downloads, used))
    }

    async fn remaining_uploads(&self, user_id: &str) -> Result<Option<i64>, BackendError> {
        let Some(entitlements) = self.entitlements_of(user_id)? else {
            return Ok(None);
        };
        let since = Self::month_start(Utc::now());
        let used = PackTable::new(&self.db).created_since(user_id, since)?;
        Ok(Self::remaining(entitlements.uploads, used))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        debug!(target: "arsound::store", bucket, path, bytes = data.len(), "storing object");
        ObjectTable::new(&self.db).put(bucket, path, content_type, &data, upsert)?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), BackendError> {
        ObjectTable::new(&self.db).delete(bucket, path)?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{PUBLIC_URL_PREFIX}{bucket}/{path}")
    }

    fn object_path(&self, bucket: &str, public_url: &str) -> Option<String> {
        let path = public_url
            .strip_prefix(PUBLIC_URL_PREFIX)?
            .strip_prefix(bucket)?
            .strip_prefix('/')?;
        if path.is_empty() {
            None
        } else {
            Some(path.to_string())
        }
    }
}
