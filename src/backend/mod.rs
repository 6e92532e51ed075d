// SPDX-License-Identifier: MPL-2.0

//! Collaborator interfaces for the hosted backend.
//!
//! The application never talks to a global client. `main` builds one
//! [`Backend`] (remote or local) and hands it to every component.

mod rest;
#[cfg(test)]
pub mod testing;
mod types;

pub use rest::{RestBackend, RestConfig};
pub use types::{
    Identity, LikeRow, LikedPack, Pack, PackRow, PlayEvent, Plan, Profile, ProfileRow,
    ProfileUpdate,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Session collaborator.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self) -> Result<Option<Identity>, BackendError>;

    /// Receiver of auth-state transitions. The value is the identity after
    /// the transition, `None` once signed out.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    async fn sign_out(&self) -> Result<(), BackendError>;
}

/// Relational rows and the two quota procedures.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn profile(&self, id: &str) -> Result<Option<Profile>, BackendError>;

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), BackendError>;

    async fn update_packs_count(&self, id: &str, packs_count: i64) -> Result<(), BackendError>;

    /// Owner of `username`, if any profile has claimed it.
    async fn profile_id_by_username(&self, username: &str)
    -> Result<Option<String>, BackendError>;

    /// All packs owned by `owner_id`, newest first.
    async fn packs_by_owner(&self, owner_id: &str) -> Result<Vec<Pack>, BackendError>;

    /// All likes by `user_id` with their joined pack, newest first.
    async fn likes_by_user(&self, user_id: &str) -> Result<Vec<LikedPack>, BackendError>;

    /// Play events for `pack_ids` at or after `since`, oldest first.
    async fn plays_since(
        &self,
        pack_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<PlayEvent>, BackendError>;

    /// `None` when the quota is unlimited or unknown.
    async fn remaining_downloads(&self, user_id: &str) -> Result<Option<i64>, BackendError>;

    async fn remaining_uploads(&self, user_id: &str) -> Result<Option<i64>, BackendError>;
}

/// Bucketed object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError>;

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), BackendError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Inverse of [`ObjectStore::public_url`] for objects in `bucket`.
    fn object_path(&self, bucket: &str, public_url: &str) -> Option<String>;
}

/// Handle to the three collaborators, cheap to clone.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthProvider>,
    pub data: Arc<dyn DataStore>,
    pub objects: Arc<dyn ObjectStore>,
}

impl Backend {
    /// Build a backend where one value implements every collaborator.
    pub fn from_shared<T>(inner: Arc<T>) -> Self
    where
        T: AuthProvider + DataStore + ObjectStore + 'static,
    {
        Self {
            auth: inner.clone(),
            data: inner.clone(),
            objects: inner,
        }
    }
}
