// SPDX-License-Identifier: MPL-2.0

//! Profile edit workflow.
//!
//! `Viewing -> Editing -> Saving -> Viewing`, or `Editing -> Viewing` on
//! cancel. A failed save returns to `Editing` with the draft intact so the
//! user can retry.

use crate::backend::{Backend, BackendError, Profile, ProfileUpdate};
use crate::config::{AVATAR_BUCKET, BIO_MAX_LEN};
use crate::profile::avatar::{AvatarError, StagedAvatar};
use crate::profile::username::{Availability, UsernameError, UsernameProbe, validate_username};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum EditError {
    #[error("{0}")]
    Username(#[from] UsernameError),
    #[error("That username is already taken")]
    UsernameTaken,
    #[error("Bio must be at most {BIO_MAX_LEN} characters")]
    BioTooLong,
    #[error("{0}")]
    Avatar(#[from] AvatarError),
    #[error("Could not upload the image: {0}")]
    Upload(BackendError),
    #[error("Could not save the profile: {0}")]
    Update(BackendError),
    #[error("The profile is not being edited")]
    NotEditing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Viewing,
    Editing,
    Saving,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditDraft {
    pub username: String,
    pub bio: String,
    pub avatar: Option<StagedAvatar>,
}

impl EditDraft {
    fn from_profile(profile: Option<&Profile>) -> Self {
        Self {
            username: profile.map(|p| p.username.clone()).unwrap_or_default(),
            bio: profile.and_then(|p| p.bio.clone()).unwrap_or_default(),
            avatar: None,
        }
    }
}

/// User-visible outcome of the last save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

pub struct EditController {
    backend: Backend,
    user_id: String,
    committed: Option<Profile>,
    mode: EditMode,
    draft: EditDraft,
    probe: UsernameProbe,
    notice: Option<Notice>,
}

impl EditController {
    pub fn new(backend: &Backend, user_id: &str, profile: Option<&Profile>) -> Self {
        let committed_name = profile.map(|p| p.username.as_str()).unwrap_or("");
        Self {
            probe: UsernameProbe::new(backend.data.clone(), user_id, committed_name),
            backend: backend.clone(),
            user_id: user_id.to_string(),
            committed: profile.cloned(),
            mode: EditMode::Viewing,
            draft: EditDraft::from_profile(profile),
            notice: None,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn draft(&self) -> &EditDraft {
        &self.draft
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Wait for a pending username check to resolve.
    pub async fn settled(&self) -> Availability {
        self.probe.settled().await
    }

    /// Adopt a freshly loaded profile. The draft follows it unless an edit
    /// session is open.
    pub fn sync_profile(&mut self, profile: Option<&Profile>) {
        self.committed = profile.cloned();
        self.probe
            .set_committed(profile.map(|p| p.username.as_str()).unwrap_or(""));
        if self.mode == EditMode::Viewing {
            self.draft = EditDraft::from_profile(profile);
        }
    }

    pub fn begin(&mut self) {
        if self.mode != EditMode::Viewing {
            return;
        }
        self.draft = EditDraft::from_profile(self.committed.as_ref());
        self.probe.cancel();
        self.notice = None;
        self.mode = EditMode::Editing;
    }

    /// Update the draft username and schedule an availability check.
    /// Must be called from within a Tokio runtime.
    pub fn set_username(&mut self, username: &str) {
        if self.mode != EditMode::Editing {
            return;
        }
        self.draft.username = username.to_string();
        self.probe.submit(username.trim());
    }

    pub fn set_bio(&mut self, bio: &str) {
        if self.mode == EditMode::Editing {
            self.draft.bio = bio.to_string();
        }
    }

    pub fn stage_avatar(&mut self, avatar: StagedAvatar) {
        if self.mode == EditMode::Editing {
            self.draft.avatar = Some(avatar);
        }
    }

    pub fn cancel(&mut self) {
        if self.mode != EditMode::Editing {
            return;
        }
        self.probe.cancel();
        self.draft = EditDraft::from_profile(self.committed.as_ref());
        self.notice = None;
        self.mode = EditMode::Viewing;
    }

    /// Validate and commit the draft. On success the controller is back in
    /// `Viewing` and the caller should reload the profile.
    pub async fn save(&mut self) -> Result<(), EditError> {
        if self.mode != EditMode::Editing {
            return Err(EditError::NotEditing);
        }

        let username = self.draft.username.trim().to_string();
        if let Err(e) = validate_username(&username) {
            return self.reject(e.into());
        }
        if self.probe.availability().is_known_unavailable() {
            return self.reject(EditError::UsernameTaken);
        }

        let bio = self.draft.bio.trim().to_string();
        if bio.chars().count() > BIO_MAX_LEN {
            return self.reject(EditError::BioTooLong);
        }

        let checked_avatar = match self.draft.avatar.as_ref().map(StagedAvatar::validate) {
            Some(Ok(checked)) => Some(checked),
            Some(Err(e)) => return self.reject(e.into()),
            None => None,
        };

        self.mode = EditMode::Saving;

        let previous_avatar = self.committed.as_ref().and_then(|p| p.avatar_url.clone());
        let staged_data = self.draft.avatar.as_ref().map(|a| a.data.clone());
        let avatar_url = match (checked_avatar, staged_data) {
            (Some(checked), Some(data)) => {
                if let Some(previous) = previous_avatar.as_deref() {
                    self.remove_previous_avatar(previous).await;
                }

                let path = checked.object_path(&self.user_id, Utc::now());
                if let Err(e) = self
                    .backend
                    .objects
                    .upload(
                        AVATAR_BUCKET,
                        &path,
                        data,
                        &checked.content_type,
                        true,
                    )
                    .await
                {
                    return self.reject(EditError::Upload(e));
                }
                Some(self.backend.objects.public_url(AVATAR_BUCKET, &path))
            }
            _ => previous_avatar,
        };

        let update = ProfileUpdate {
            username: username.clone(),
            bio: if bio.is_empty() { None } else { Some(bio) },
            avatar_url,
        };

        match self.backend.data.update_profile(&self.user_id, &update).await {
            Ok(()) => {}
            Err(BackendError::Conflict(detail)) => {
                debug!(target: "arsound::edit", detail = %detail, "username claimed concurrently");
                return self.reject(EditError::UsernameTaken);
            }
            Err(e) => return self.reject(EditError::Update(e)),
        }

        info!(target: "arsound::edit", user = %self.user_id, username = %update.username, "profile updated");
        self.probe.set_committed(&username);
        self.draft.avatar = None;
        self.notice = Some(Notice::Success("Profile updated".to_string()));
        self.mode = EditMode::Viewing;
        Ok(())
    }

    /// Best effort; a leftover object is preferable to a failed save.
    async fn remove_previous_avatar(&self, public_url: &str) {
        let Some(path) = self.backend.objects.object_path(AVATAR_BUCKET, public_url) else {
            return;
        };
        if let Err(e) = self.backend.objects.delete(AVATAR_BUCKET, &path).await {
            debug!(target: "arsound::edit", path = %path, error = %e, "previous avatar not removed");
        }
    }

    fn reject(&mut self, error: EditError) -> Result<(), EditError> {
        warn!(target: "arsound::edit", user = %self.user_id, error = %error, "profile save rejected");
        self.notice = Some(Notice::Error(error.to_string()));
        self.mode = EditMode::Editing;
        Err(error)
    }
}
