// SPDX-License-Identifier: MPL-2.0

use crate::config::AVATAR_MAX_BYTES;
use chrono::{DateTime, Utc};
use image::ImageFormat;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvatarError {
    #[error("Image must be smaller than {} MB", AVATAR_MAX_BYTES / 1024 / 1024)]
    TooLarge { size: usize },
    #[error("File must be an image")]
    NotAnImage,
}

/// An avatar file staged in the edit draft, not yet uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedAvatar {
    pub file_name: String,
    /// MIME type as declared by whoever picked the file.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Result of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedAvatar {
    pub content_type: String,
    pub extension: String,
}

impl StagedAvatar {
    pub fn new(file_name: &str, content_type: Option<&str>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.map(str::to_string),
            data,
        }
    }

    /// Read a file from disk; the MIME type is sniffed at validation time.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".to_string());
        Ok(Self {
            file_name,
            content_type: None,
            data,
        })
    }

    /// Declared type, or the one recognised from the file's magic bytes.
    pub fn resolved_content_type(&self) -> Option<String> {
        self.content_type
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                image::guess_format(&self.data)
                    .ok()
                    .map(|f| f.to_mime_type().to_string())
            })
    }

    pub fn validate(&self) -> Result<CheckedAvatar, AvatarError> {
        if self.data.len() > AVATAR_MAX_BYTES {
            return Err(AvatarError::TooLarge {
                size: self.data.len(),
            });
        }

        let content_type = self
            .resolved_content_type()
            .filter(|t| t.starts_with("image/"))
            .ok_or(AvatarError::NotAnImage)?;

        let extension = Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .or_else(|| {
                ImageFormat::from_mime_type(&content_type)
                    .and_then(|f| f.extensions_str().first().map(|e| e.to_string()))
            })
            .unwrap_or_else(|| "img".to_string());

        Ok(CheckedAvatar {
            content_type,
            extension,
        })
    }
}

impl CheckedAvatar {
    /// Object path inside the avatars bucket.
    pub fn object_path(&self, user_id: &str, at: DateTime<Utc>) -> String {
        format!("{user_id}/avatar-{}.{}", at.timestamp_millis(), self.extension)
    }
}
