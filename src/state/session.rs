// SPDX-License-Identifier: MPL-2.0

use crate::backend::{AuthProvider, BackendError, Identity};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Authenticated(Identity),
    Redirect(Route),
}

/// Holds the current identity and keeps it in step with the auth provider.
#[derive(Clone)]
pub struct SessionResolver {
    auth: Arc<dyn AuthProvider>,
    identity: Arc<RwLock<Option<Identity>>>,
}

impl SessionResolver {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            auth,
            identity: Arc::new(RwLock::new(None)),
        }
    }

    /// Ask the provider who is signed in. A missing session, or a failed
    /// lookup, redirects to the login view.
    pub async fn resolve(&self) -> Resolution {
        let identity = match self.auth.current_user().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(target: "arsound::session", error = %e, "failed to resolve session");
                None
            }
        };

        self.set(identity.clone());
        match identity {
            Some(identity) => Resolution::Authenticated(identity),
            None => Resolution::Redirect(Route::Login),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Follow auth-state transitions until the returned listener is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn listen(&self) -> AuthListener {
        let mut rx = self.auth.subscribe();
        let resolver = self.clone();

        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                debug!(
                    target: "arsound::session",
                    signed_in = next.is_some(),
                    "auth state changed"
                );
                resolver.set(next);
            }
        });

        AuthListener { handle }
    }

    pub async fn sign_out(&self) -> Result<(), BackendError> {
        self.auth.sign_out().await?;
        self.set(None);
        Ok(())
    }

    fn set(&self, identity: Option<Identity>) {
        *self.identity.write().unwrap_or_else(|e| e.into_inner()) = identity;
    }
}

/// Subscription to auth-state changes; unsubscribes on drop.
pub struct AuthListener {
    handle: JoinHandle<()>,
}

impl Drop for AuthListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
