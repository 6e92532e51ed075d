// SPDX-License-Identifier: MPL-2.0

//! The signed-in user's profile dashboard.

pub mod avatar;
pub mod collections;
mod dashboard;
pub mod edit;
mod entitlements;
pub mod limits;
pub mod loader;
pub mod stats;
pub mod username;

pub use avatar::{AvatarError, StagedAvatar};
pub use collections::{LikedPacksView, OwnedPacksView};
pub use dashboard::{DashboardSnapshot, LoadOutcome, Loadable, ProfileDashboard};
pub use edit::{EditController, EditError, EditMode, Notice};
pub use entitlements::{Entitlements, Quota};
pub use limits::{LimitsCard, QuotaStatus};
pub use stats::{Locale, Statistics};
pub use username::Availability;
