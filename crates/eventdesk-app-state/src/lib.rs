//! View-facing state for the EventDesk front end.
//!
//! `SessionContext` owns the session. The other modules are plain state
//! machines driven by actions, plus async helpers that run one API call and
//! feed the outcome back in.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dashboard;
pub mod rsvp;
pub mod session;
pub mod view;
pub mod wizard;

pub use dashboard::{AdminDashboard, OrganizerDashboard};
pub use rsvp::{
    GuestRsvpAction, GuestRsvpForm, GuestRsvpState, GuestRsvpStatus, MAX_EXTRA_GUESTS, RsvpField,
    RsvpValidationError, apply_rsvp_action, submit_guest_rsvp,
};
pub use session::{Credentials, LoginError, Registration, SessionContext};
pub use view::{ApiFailure, LoadState};
pub use wizard::{
    EventDraft, EventWizardState, WizardAction, WizardField, WizardStatus, WizardStep,
    WizardValidationError, apply_wizard_action, submit_event_wizard,
};
