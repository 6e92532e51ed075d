// SPDX-License-Identifier: MPL-2.0

//! The profile page as a pull-based view-model.
//!
//! Session -> profile -> (owned packs + stats, liked packs, limits). The last
//! three run concurrently and write disjoint sections of the snapshot, each
//! with its own loading flag.

use crate::backend::{Backend, Identity, LikedPack, Pack, Plan, Profile};
use crate::profile::collections::{
    LikedPacksView, OwnedPacksView, load_liked_packs, load_owned_packs,
};
use crate::profile::edit::{EditController, EditError};
use crate::profile::limits::LimitsCard;
use crate::profile::loader::{display_bio, display_name, load_profile};
use crate::profile::stats::{Locale, Statistics, load_statistics};
use crate::profile::Entitlements;
use crate::state::{AuthListener, Resolution, Route, SessionResolver};
use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
    Idle,
    Loading,
    Ready(T),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Idle
    }
}

impl<T> Loadable<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            Loadable::Idle | Loadable::Loading => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub identity: Option<Identity>,
    /// `Ready(None)` when the row is missing or could not be read.
    pub profile: Loadable<Option<Profile>>,
    pub owned_packs: Loadable<Vec<Pack>>,
    pub liked_packs: Loadable<Vec<LikedPack>>,
    pub statistics: Loadable<Statistics>,
    pub limits: Loadable<LimitsCard>,
}

impl DashboardSnapshot {
    pub fn loaded_profile(&self) -> Option<&Profile> {
        self.profile.ready().and_then(Option::as_ref)
    }

    pub fn plan(&self) -> Plan {
        self.loaded_profile().map(|p| p.plan).unwrap_or_default()
    }

    pub fn entitlements(&self) -> Entitlements {
        Entitlements::for_plan(self.plan())
    }

    pub fn display_name(&self) -> &str {
        display_name(self.loaded_profile())
    }

    pub fn bio(&self) -> &str {
        display_bio(self.loaded_profile())
    }

    pub fn owned_view(&self) -> OwnedPacksView {
        OwnedPacksView::from_packs(self.owned_packs.ready().map(Vec::as_slice))
    }

    pub fn liked_view(&self) -> LikedPacksView {
        LikedPacksView::from_likes(self.liked_packs.ready().map(Vec::as_slice))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    Redirect(Route),
}

pub struct ProfileDashboard {
    backend: Backend,
    session: SessionResolver,
    locale: Locale,
    state: watch::Sender<DashboardSnapshot>,
    _auth_listener: AuthListener,
}

impl ProfileDashboard {
    /// Must be called from within a Tokio runtime; the auth listener is
    /// attached here and detached when the dashboard is dropped.
    pub fn mount(backend: &Backend, locale: Locale) -> Self {
        let session = SessionResolver::new(backend.auth.clone());
        let auth_listener = session.listen();
        let (state, _) = watch::channel(DashboardSnapshot::default());

        Self {
            backend: backend.clone(),
            session,
            locale,
            state,
            _auth_listener: auth_listener,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> &SessionResolver {
        &self.session
    }

    pub async fn load(&self) -> LoadOutcome {
        let identity = match self.session.resolve().await {
            Resolution::Authenticated(identity) => identity,
            Resolution::Redirect(route) => {
                self.state.send_replace(DashboardSnapshot::default());
                return LoadOutcome::Redirect(route);
            }
        };

        self.load_for(identity).await;
        LoadOutcome::Ready
    }

    /// Reload with the held identity, resolving the session only if none is held.
    pub async fn reload(&self) -> LoadOutcome {
        match self.session.identity() {
            Some(identity) => {
                self.load_for(identity).await;
                LoadOutcome::Ready
            }
            None => self.load().await,
        }
    }

    /// Edit controller seeded from the current snapshot.
    pub fn editor(&self) -> Option<EditController> {
        let snapshot = self.state.borrow();
        let identity = snapshot.identity.as_ref()?;
        Some(EditController::new(
            &self.backend,
            &identity.id,
            snapshot.loaded_profile(),
        ))
    }

    /// Save through `editor`, then reload and hand the fresh profile back to it.
    pub async fn save(&self, editor: &mut EditController) -> Result<(), EditError> {
        editor.save().await?;
        self.reload().await;
        editor.sync_profile(self.snapshot().loaded_profile());
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut DashboardSnapshot)) {
        self.state.send_modify(apply);
    }

    async fn load_for(&self, identity: Identity) {
        let user_id = identity.id.clone();
        self.update(|s| {
            s.identity = Some(identity);
            s.profile = Loadable::Loading;
        });

        let profile = load_profile(self.backend.data.as_ref(), &user_id).await;
        self.update(|s| s.profile = Loadable::Ready(profile.clone()));

        let Some(profile) = profile else {
            self.update(|s| {
                s.owned_packs = Loadable::Idle;
                s.liked_packs = Loadable::Idle;
                s.statistics = Loadable::Idle;
                s.limits = Loadable::Idle;
            });
            return;
        };

        self.update(|s| {
            s.owned_packs = Loadable::Loading;
            s.liked_packs = Loadable::Loading;
            s.statistics = Loadable::Loading;
            s.limits = Loadable::Loading;
        });

        let data = self.backend.data.as_ref();
        let owned_and_stats = async {
            let packs = load_owned_packs(data, &profile).await;
            self.update(|s| s.owned_packs = Loadable::Ready(packs.clone()));
            let stats = load_statistics(data, &packs, profile.plan, self.locale, Utc::now()).await;
            self.update(|s| s.statistics = Loadable::Ready(stats));
        };
        let liked = async {
            let likes = load_liked_packs(data, &profile.id).await;
            self.update(|s| s.liked_packs = Loadable::Ready(likes));
        };
        let limits = async {
            let card = LimitsCard::load(data, &profile.id, profile.plan).await;
            self.update(|s| s.limits = Loadable::Ready(card));
        };

        tokio::join!(owned_and_stats, liked, limits);
        debug!(target: "arsound::dashboard", user = %user_id, "dashboard loaded");
    }
}
