// SPDX-License-Identifier: MPL-2.0

//! SQLite implementation of every backend collaborator.
//!
//! Used for offline development, the demo command and tests. Semantics follow
//! the hosted backend: the same tables, the same quota procedures, and a
//! unique username column whose violations surface as conflicts.

mod db;
mod demo;
mod local;
mod objects;
mod packs;
mod profiles;
mod schema;

pub use db::Db;
pub use demo::seed_demo;
pub use local::LocalStore;
pub use objects::ObjectTable;
pub use packs::{NewPack, PackTable};
pub use profiles::{NewProfile, ProfileTable};

use crate::backend::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("constraint violated: {0}")]
    Conflict(String),
    #[error("not found")]
    NotFound,
    #[error("database path error: {0}")]
    Path(String),
}

impl StoreError {
    /// Classify errors from INSERT/UPDATE, splitting out constraint violations.
    fn from_write(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                )
            }
            other => StoreError::Database(other),
        }
    }
}

impl From<StoreError> for BackendError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(message) => BackendError::Conflict(message),
            other => BackendError::Storage(other.to_string()),
        }
    }
}
