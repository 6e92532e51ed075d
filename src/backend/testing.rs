// SPDX-License-Identifier: MPL-2.0

//! Call-recording wrapper around the local store, with failure injection.

use crate::backend::{
    AuthProvider, Backend, BackendError, DataStore, Identity, LikedPack, ObjectStore, Pack,
    PlayEvent, Profile, ProfileUpdate,
};
use crate::store::LocalStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub struct RecordingBackend {
    inner: LocalStore,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LocalStore::open_in_memory().unwrap(),
            calls: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        })
    }

    pub fn backend(self: &Arc<Self>) -> Backend {
        Backend::from_shared(self.clone())
    }

    pub fn local(&self) -> &LocalStore {
        &self.inner
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    /// Make every later call to `method` fail with a network error.
    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    fn hit(&self, method: &'static str) -> Result<(), BackendError> {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
        if self.failing.lock().unwrap().contains(method) {
            return Err(BackendError::Network(format!("injected failure in {method}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for RecordingBackend {
    async fn current_user(&self) -> Result<Option<Identity>, BackendError> {
        self.hit("current_user")?;
        self.inner.current_user().await
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.inner.subscribe()
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.hit("sign_out")?;
        self.inner.sign_out().await
    }
}

#[async_trait]
impl DataStore for RecordingBackend {
    async fn profile(&self, id: &str) -> Result<Option<Profile>, BackendError> {
        self.hit("profile")?;
        self.inner.profile(id).await
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), BackendError> {
        self.hit("update_profile")?;
        self.inner.update_profile(id, update).await
    }

    async fn update_packs_count(&self, id: &str, packs_count: i64) -> Result<(), BackendError> {
        self.hit("update_packs_count")?;
        self.inner.update_packs_count(id, packs_count).await
    }

    async fn profile_id_by_username(
        &self,
        username: &str,
    ) -> Result<Option<String>, BackendError> {
        self.hit("profile_id_by_username")?;
        self.inner.profile_id_by_username(username).await
    }

    async fn packs_by_owner(&self, owner_id: &str) -> Result<Vec<Pack>, BackendError> {
        self.hit("packs_by_owner")?;
        self.inner.packs_by_owner(owner_id).await
    }

    async fn likes_by_user(&self, user_id: &str) -> Result<Vec<LikedPack>, BackendError> {
        self.hit("likes_by_user")?;
        self.inner.likes_by_user(user_id).await
    }

    async fn plays_since(
        &self,
        pack_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<PlayEvent>, BackendError> {
        self.hit("plays_since")?;
        self.inner.plays_since(pack_ids, since).await
    }

    async fn remaining_downloads(&self, user_id: &str) -> Result<Option<i64>, BackendError> {
        self.hit("remaining_downloads")?;
        self.inner.remaining_downloads(user_id).await
    }

    async fn remaining_uploads(&self, user_id: &str) -> Result<Option<i64>, BackendError> {
        self.hit("remaining_uploads")?;
        self.inner.remaining_uploads(user_id).await
    }
}

#[async_trait]
impl ObjectStore for RecordingBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        self.hit("upload")?;
        self.inner.upload(bucket, path, data, content_type, upsert).await
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), BackendError> {
        self.hit("delete")?;
        self.inner.delete(bucket, path).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.inner.public_url(bucket, path)
    }

    fn object_path(&self, bucket: &str, public_url: &str) -> Option<String> {
        self.inner.object_path(bucket, public_url)
    }
}
