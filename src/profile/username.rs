// SPDX-License-Identifier: MPL-2.0

//! Username rules and the debounced availability probe.

use crate::backend::DataStore;
use crate::config::{USERNAME_DEBOUNCE, USERNAME_MAX_LEN};
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username pattern compiles"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username cannot be empty")]
    Empty,
    #[error("Username must be at most {USERNAME_MAX_LEN} characters")]
    TooLong,
    #[error("Username may only contain letters, numbers and underscores")]
    InvalidCharacters,
}

pub fn validate_username(username: &str) -> Result<(), UsernameError> {
    if username.is_empty() {
        return Err(UsernameError::Empty);
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(UsernameError::TooLong);
    }
    if !USERNAME_RE.is_match(username) {
        return Err(UsernameError::InvalidCharacters);
    }
    Ok(())
}

pub fn is_valid_username(username: &str) -> bool {
    validate_username(username).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// No check has run for the current draft.
    Unknown,
    Checking,
    Available,
    Unavailable,
}

impl Availability {
    pub fn is_known_unavailable(self) -> bool {
        self == Availability::Unavailable
    }
}

/// One availability check, without debounce.
///
/// Invalid names resolve to `Unavailable` and the committed name to
/// `Available`, neither touching the store. Lookup failures resolve to
/// `Available`; the write path is the final arbiter.
pub async fn probe_availability(
    data: &dyn DataStore,
    self_id: &str,
    committed: &str,
    candidate: &str,
) -> Availability {
    if !is_valid_username(candidate) {
        return Availability::Unavailable;
    }
    if candidate == committed {
        return Availability::Available;
    }

    match data.profile_id_by_username(candidate).await {
        Ok(None) => Availability::Available,
        Ok(Some(owner)) if owner == self_id => Availability::Available,
        Ok(Some(_)) => Availability::Unavailable,
        Err(e) => {
            warn!(target: "arsound::username", candidate, error = %e, "availability lookup failed");
            Availability::Available
        }
    }
}

/// Debounced availability checker.
///
/// Each `submit` supersedes the previous request: the pending task is aborted
/// and its generation retired, so a late result can never overwrite a newer one.
pub struct UsernameProbe {
    data: Arc<dyn DataStore>,
    self_id: String,
    committed: String,
    debounce: Duration,
    state: Arc<watch::Sender<Availability>>,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl UsernameProbe {
    pub fn new(data: Arc<dyn DataStore>, self_id: &str, committed: &str) -> Self {
        let (state, _) = watch::channel(Availability::Unknown);
        Self {
            data,
            self_id: self_id.to_string(),
            committed: committed.to_string(),
            debounce: USERNAME_DEBOUNCE,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn set_committed(&mut self, username: &str) {
        self.committed = username.to_string();
    }

    pub fn availability(&self) -> Availability {
        *self.state.borrow()
    }

    /// Schedule a check of `candidate` after the debounce interval.
    /// Must be called from within a Tokio runtime.
    pub fn submit(&mut self, candidate: &str) {
        let generation = self.supersede();
        self.state.send_replace(Availability::Checking);

        let data = self.data.clone();
        let self_id = self.self_id.clone();
        let committed = self.committed.clone();
        let candidate = candidate.to_string();
        let debounce = self.debounce;
        let state = self.state.clone();
        let current = self.generation.clone();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let result = probe_availability(data.as_ref(), &self_id, &committed, &candidate).await;
            let applied = state.send_if_modified(|value| {
                if current.load(Ordering::SeqCst) == generation {
                    *value = result;
                    true
                } else {
                    false
                }
            });
            debug!(target: "arsound::username", candidate = %candidate, ?result, applied, "availability resolved");
        }));
    }

    /// Drop any pending check and forget the last result.
    pub fn cancel(&mut self) {
        self.supersede();
        self.state.send_replace(Availability::Unknown);
    }

    /// Wait for the current check, if any, to resolve.
    pub async fn settled(&self) -> Availability {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|a| *a != Availability::Checking).await {
            Ok(value) => *value,
            Err(_) => self.availability(),
        }
    }

    fn supersede(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for UsernameProbe {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use crate::store::{NewProfile, ProfileTable};

    fn backend() -> Arc<RecordingBackend> {
        let recording = RecordingBackend::new();
        let profiles = ProfileTable::new(recording.local().db());
        profiles.insert(&NewProfile::new("me", "abc")).unwrap();
        profiles.insert(&NewProfile::new("other", "taken_name")).unwrap();
        recording
    }

    #[test]
    fn test_username_format() {
        assert!(is_valid_username("ab"));
        assert!(is_valid_username("Beat_Maker_1"));
        assert!(is_valid_username("abcdefghijkl"));
        assert_eq!(validate_username("abcdefghijklm"), Err(UsernameError::TooLong));
        assert_eq!(validate_username(""), Err(UsernameError::Empty));
        assert_eq!(
            validate_username("with space"),
            Err(UsernameError::InvalidCharacters)
        );
        assert_eq!(validate_username("ñandu"), Err(UsernameError::InvalidCharacters));
        assert_eq!(validate_username("a-b"), Err(UsernameError::InvalidCharacters));
    }

    #[tokio::test]
    async fn test_invalid_username_never_queries_store() {
        let backend = backend();
        for candidate in ["", "bad name", "waytoolongusername", "dash-dash"] {
            let result = probe_availability(backend.as_ref(), "me", "abc", candidate).await;
            assert_eq!(result, Availability::Unavailable);
        }
        assert_eq!(backend.calls("profile_id_by_username"), 0);
    }

    #[tokio::test]
    async fn test_committed_username_is_available_without_lookup() {
        let backend = backend();
        let result = probe_availability(backend.as_ref(), "me", "abc", "abc").await;
        assert_eq!(result, Availability::Available);
        assert_eq!(backend.calls("profile_id_by_username"), 0);
    }

    #[tokio::test]
    async fn test_taken_and_free_names() {
        let backend = backend();
        assert_eq!(
            probe_availability(backend.as_ref(), "me", "abc", "taken_name").await,
            Availability::Unavailable
        );
        assert_eq!(
            probe_availability(backend.as_ref(), "me", "abc", "fresh").await,
            Availability::Available
        );
        assert_eq!(backend.calls("profile_id_by_username"), 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_optimistic() {
        let backend = backend();
        backend.fail("profile_id_by_username");
        assert_eq!(
            probe_availability(backend.as_ref(), "me", "abc", "taken_name").await,
            Availability::Available
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_rapid_input() {
        let backend = backend();
        let mut probe = UsernameProbe::new(backend.clone(), "me", "abc");

        probe.submit("t");
        probe.submit("ta");
        probe.submit("taken_name");
        assert_eq!(probe.availability(), Availability::Checking);

        assert_eq!(probe.settled().await, Availability::Unavailable);
        assert_eq!(backend.calls("profile_id_by_username"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_happens_before_debounce_elapses() {
        let backend = backend();
        let mut probe = UsernameProbe::new(backend.clone(), "me", "abc");

        probe.submit("fresh");
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(probe.availability(), Availability::Checking);
        assert_eq!(backend.calls("profile_id_by_username"), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(probe.settled().await, Availability::Available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_result() {
        let backend = backend();
        let mut probe = UsernameProbe::new(backend.clone(), "me", "abc");

        probe.submit("taken_name");
        probe.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(probe.availability(), Availability::Unknown);
        assert_eq!(backend.calls("profile_id_by_username"), 0);
    }
}
