// SPDX-License-Identifier: MPL-2.0

use crate::backend::types::{LikeRow, PackRow, ProfileRow};
use crate::backend::{
    AuthProvider, BackendError, DataStore, Identity, LikedPack, ObjectStore, Pack, PlayEvent,
    Profile, ProfileUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;
use url::Url;

const PROFILE_COLUMNS: &str = "id,username,bio,avatar_url,plan,packs_count,followers_count,total_likes_received,total_sales,total_plays_count,created_at";

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: Url,
    pub anon_key: String,
    pub access_token: Option<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
}

/// Client for the hosted backend's REST, auth and storage endpoints.
pub struct RestBackend {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
    access_token: RwLock<Option<String>>,
    auth_state: watch::Sender<Option<Identity>>,
}

impl RestBackend {
    pub fn new(config: RestConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let mut base = config.base_url;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let (auth_state, _) = watch::channel(None);

        Ok(Self {
            http,
            base,
            anon_key: config.anon_key,
            access_token: RwLock::new(config.access_token),
            auth_state,
        })
    }

    fn token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|e| BackendError::InvalidResponse(format!("bad endpoint {path}: {e}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.token().unwrap_or_else(|| self.anon_key.clone());
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url, BackendError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => BackendError::NotAuthenticated,
            StatusCode::CONFLICT => BackendError::Conflict(body),
            _ => BackendError::Status {
                status: status.as_u16(),
                body,
            },
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    async fn call_quota(&self, procedure: &str, user_id: &str) -> Result<Option<i64>, BackendError> {
        let url = self.endpoint(&format!("rest/v1/rpc/{procedure}"))?;
        let request = self
            .request(Method::POST, url)
            .json(&serde_json::json!({ "user_id": user_id }));
        self.send_json::<Option<i64>>(request).await
    }

    fn object_url(&self, bucket: &str, path: &str) -> Result<Url, BackendError> {
        self.endpoint(&format!("storage/v1/object/{bucket}/{path}"))
    }
}

/// `in.("a","b")` filter value.
fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn timestamp_filter(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}.{}", at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn current_user(&self) -> Result<Option<Identity>, BackendError> {
        if self.token().is_none() {
            return Ok(None);
        }

        let url = self.endpoint("auth/v1/user")?;
        let identity = match self
            .send_json::<UserResponse>(self.request(Method::GET, url))
            .await
        {
            Ok(user) => Some(Identity {
                id: user.id,
                email: user.email,
            }),
            Err(BackendError::NotAuthenticated) => None,
            Err(e) => return Err(e),
        };

        self.auth_state.send_if_modified(|current| {
            if *current == identity {
                false
            } else {
                *current = identity.clone();
                true
            }
        });

        Ok(identity)
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.auth_state.subscribe()
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.token().is_some() {
            let url = self.endpoint("auth/v1/logout")?;
            self.send(self.request(Method::POST, url)).await?;
        }

        *self
            .access_token
            .write()
            .unwrap_or_else(|e| e.into_inner()) = None;
        self.auth_state.send_replace(None);
        Ok(())
    }
}

#[async_trait]
impl DataStore for RestBackend {
    async fn profile(&self, id: &str) -> Result<Option<Profile>, BackendError> {
        let url = self.table_url(
            "profiles",
            &[
                ("select", PROFILE_COLUMNS.to_string()),
                ("id", format!("eq.{id}")),
                ("limit", "1".to_string()),
            ],
        )?;
        let rows: Vec<ProfileRow> = self.send_json(self.request(Method::GET, url)).await?;
        Ok(rows.into_iter().next().map(Profile::from))
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), BackendError> {
        let url = self.table_url("profiles", &[("id", format!("eq.{id}"))])?;
        let request = self.request(Method::PATCH, url).json(update);
        self.send(request).await?;
        Ok(())
    }

    async fn update_packs_count(&self, id: &str, packs_count: i64) -> Result<(), BackendError> {
        let url = self.table_url("profiles", &[("id", format!("eq.{id}"))])?;
        let request = self
            .request(Method::PATCH, url)
            .json(&serde_json::json!({ "packs_count": packs_count }));
        self.send(request).await?;
        Ok(())
    }

    async fn profile_id_by_username(
        &self,
        username: &str,
    ) -> Result<Option<String>, BackendError> {
        #[derive(Deserialize)]
        struct IdOnly {
            id: String,
        }

        let url = self.table_url(
            "profiles",
            &[
                ("select", "id".to_string()),
                ("username", format!("eq.{username}")),
                ("limit", "1".to_string()),
            ],
        )?;
        let rows: Vec<IdOnly> = self.send_json(self.request(Method::GET, url)).await?;
        Ok(rows.into_iter().next().map(|r| r.id))
    }

    async fn packs_by_owner(&self, owner_id: &str) -> Result<Vec<Pack>, BackendError> {
        let url = self.table_url(
            "packs",
            &[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{owner_id}")),
                ("order", "created_at.desc".to_string()),
            ],
        )?;
        let rows: Vec<PackRow> = self.send_json(self.request(Method::GET, url)).await?;
        Ok(rows.into_iter().map(Pack::from).collect())
    }

    async fn likes_by_user(&self, user_id: &str) -> Result<Vec<LikedPack>, BackendError> {
        let url = self.table_url(
            "pack_likes",
            &[
                ("select", "pack_id,created_at,packs(*)".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".to_string()),
            ],
        )?;
        let rows: Vec<LikeRow> = self.send_json(self.request(Method::GET, url)).await?;
        Ok(rows.into_iter().map(LikedPack::from).collect())
    }

    async fn plays_since(
        &self,
        pack_ids: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<PlayEvent>, BackendError> {
        if pack_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.table_url(
            "pack_plays",
            &[
                ("select", "pack_id,played_at".to_string()),
                ("pack_id", in_filter(pack_ids)),
                ("played_at", timestamp_filter("gte", since)),
                ("order", "played_at.asc".to_string()),
            ],
        )?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn remaining_downloads(&self, user_id: &str) -> Result<Option<i64>, BackendError> {
        self.call_quota("get_remaining_downloads", user_id).await
    }

    async fn remaining_uploads(&self, user_id: &str) -> Result<Option<i64>, BackendError> {
        self.call_quota("get_remaining_uploads", user_id).await
    }
}

#[async_trait]
impl ObjectStore for RestBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), BackendError> {
        let url = self.object_url(bucket, path)?;
        debug!(target: "arsound::rest", bucket, path, bytes = data.len(), "uploading object");
        let request = self
            .request(Method::POST, url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(data);
        self.send(request)
            .await
            .map_err(|e| BackendError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), BackendError> {
        let url = self.object_url(bucket, path)?;
        self.send(self.request(Method::DELETE, url))
            .await
            .map_err(|e| BackendError::Storage(e.to_string()))?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}storage/v1/object/public/{bucket}/{path}", self.base)
    }

    fn object_path(&self, bucket: &str, public_url: &str) -> Option<String> {
        let prefix = format!("{}storage/v1/object/public/{bucket}/", self.base);
        let rest = public_url.strip_prefix(&prefix)?;
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        if path.is_empty() {
            None
        } else {
            Some(path.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(token: Option<&str>) -> RestBackend {
        RestBackend::new(RestConfig {
            base_url: Url::parse("https://project.example.co").unwrap(),
            anon_key: "anon".to_string(),
            access_token: token.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_public_url_and_object_path() {
        let backend = backend(None);
        let url = backend.public_url("avatars", "u1/avatar-1.png");
        assert_eq!(
            url,
            "https://project.example.co/storage/v1/object/public/avatars/u1/avatar-1.png"
        );
        assert_eq!(
            backend.object_path("avatars", &format!("{url}?t=123")).as_deref(),
            Some("u1/avatar-1.png")
        );
        assert_eq!(backend.object_path("covers", &url), None);
        assert_eq!(
            backend.object_path("avatars", "https://elsewhere.example/a.png"),
            None
        );
    }

    #[test]
    fn test_table_url_filters() {
        let backend = backend(None);
        let url = backend
            .table_url("packs", &[("user_id", "eq.u1".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/rest/v1/packs");
        assert_eq!(url.query(), Some("user_id=eq.u1"));
    }

    #[test]
    fn test_in_filter_quotes_values() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(in_filter(&ids), "in.(\"a\",\"b\")");
    }

    #[tokio::test]
    async fn test_current_user_without_token_is_none() {
        let backend = backend(None);
        assert_eq!(backend.current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_plays_since_skips_empty_pack_list() {
        let backend = backend(Some("token"));
        let plays = backend.plays_since(&[], Utc::now()).await.unwrap();
        assert!(plays.is_empty());
    }
}
