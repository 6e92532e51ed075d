// SPDX-License-Identifier: MPL-2.0

//! ARSOUND creator dashboard.
//!
//! The signed-in user's profile page as an async view-model: identity,
//! profile, owned and liked packs, plan-gated statistics, monthly limits and
//! the edit workflow. Every backend call goes through the collaborators in
//! [`backend`], implemented by the hosted REST backend and by a local SQLite
//! store.

pub mod backend;
pub mod config;
pub mod profile;
pub mod render;
pub mod state;
pub mod store;
