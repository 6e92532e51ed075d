// SPDX-License-Identifier: MPL-2.0

mod session;
pub mod settings;

pub use session::{AuthListener, Resolution, Route, SessionResolver};
pub use settings::{AppSettings, BackendSettings};
