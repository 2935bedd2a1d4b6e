//! Client-side route gating.
//!
//! The gate decides what to render from the persisted token and role. It is a
//! navigation convenience and not a security boundary: anything stored
//! locally can be forged, and the backend enforces real authorization.

use tracing::warn;

use crate::auth::Role;
use crate::route::AppRoute;
use crate::storage::{KeyValueStore, SessionSnapshot, load_session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Render,
    Redirect(AppRoute),
}

impl Decision {
    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }

    #[must_use]
    pub fn redirect_path(&self) -> Option<String> {
        match self {
            Self::Render => None,
            Self::Redirect(route) => Some(route.to_path()),
        }
    }
}

/// First match wins: no token goes to login, a role mismatch goes home.
#[must_use]
pub fn authorize(session: &SessionSnapshot, required: Option<Role>) -> Decision {
    if !session.has_token() {
        return Decision::Redirect(AppRoute::Login);
    }
    if let Some(required) = required
        && !session.role_matches(required)
    {
        return Decision::Redirect(AppRoute::Home);
    }
    Decision::Render
}

/// Applies the gate to a concrete route and returns the route to show.
///
/// Public routes always render, whether or not a session exists.
#[must_use]
pub fn navigate(session: &SessionSnapshot, requested: AppRoute) -> AppRoute {
    let Some(required) = requested.required_role() else {
        return requested;
    };
    match authorize(session, Some(required)) {
        Decision::Render => requested,
        Decision::Redirect(target) => target,
    }
}

/// Where a reload lands: the role's dashboard, or the public home page.
#[must_use]
pub fn initial_route(session: &SessionSnapshot) -> AppRoute {
    if !session.has_token() {
        return AppRoute::Home;
    }
    session
        .role()
        .map_or(AppRoute::Home, AppRoute::dashboard_for)
}

/// Reads the persisted session on every call.
///
/// Storage failures read as "no session", so every protected route fails
/// closed to the login view.
#[derive(Debug, Clone)]
pub struct SessionGate<S> {
    store: S,
}

impl<S: KeyValueStore> SessionGate<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match load_session(&self.store) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(%error, "session storage read failed; treating visitor as anonymous");
                SessionSnapshot::anonymous()
            }
        }
    }

    pub fn authorize(&self, required: Option<Role>) -> Decision {
        authorize(&self.snapshot(), required)
    }

    pub fn navigate(&self, requested: AppRoute) -> AppRoute {
        navigate(&self.snapshot(), requested)
    }

    pub fn initial_route(&self) -> AppRoute {
        initial_route(&self.snapshot())
    }
}
