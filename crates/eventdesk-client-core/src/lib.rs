//! Session gating and session storage for the EventDesk client.
//!
//! Everything here is synchronous and local: persisted session entries,
//! the route table, and the gate that picks a view from them.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod auth;
pub mod gate;
pub mod route;
pub mod storage;

pub use auth::{AuthInputError, Role};
pub use gate::{Decision, SessionGate, authorize, initial_route, navigate};
pub use route::{AdminSection, AppRoute, DashboardSection, MarketingPage};
pub use storage::{
    FileStore, KeyValueStore, MemoryStore, SessionSnapshot, StorageError, clear_session,
    load_session, persist_session,
};

#[cfg(target_arch = "wasm32")]
pub use storage::BrowserLocalStorage;
