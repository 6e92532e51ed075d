// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

pub const APP_ID: &str = "io.github.arsound.Arsound";

/// Shown in place of the username when the profile could not be loaded.
pub const FALLBACK_DISPLAY_NAME: &str = "Usuario";

pub const USERNAME_MAX_LEN: usize = 12;
pub const BIO_MAX_LEN: usize = 200;

/// 5 MiB
pub const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const AVATAR_BUCKET: &str = "avatars";

pub const USERNAME_DEBOUNCE: Duration = Duration::from_millis(500);

/// Trailing window of play events read for the weekly series.
pub const PLAY_WINDOW_DAYS: i64 = 30;

/// Pack titles longer than this are truncated in chart labels.
pub const CHART_LABEL_MAX: usize = 20;
