//! Public guest RSVP form.

use eventdesk_api_client::{ApiClient, GuestRsvpRequest, RsvpStatus};
use thiserror::Error;
use tracing::{debug, info};

use crate::view::ApiFailure;

pub const MAX_EXTRA_GUESTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RsvpValidationError {
    #[error("Please choose whether you are attending.")]
    MissingResponse,
    #[error("Please enter your full name.")]
    MissingName,
    #[error("Please enter a phone number or an email address.")]
    MissingContact,
    #[error("Guest count must be between 0 and {MAX_EXTRA_GUESTS}.")]
    TooManyGuests,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RsvpField {
    Response,
    FullName,
    Phone,
    Email,
    GuestCount,
    DietaryNotes,
    Message,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestRsvpForm {
    pub response: Option<RsvpStatus>,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub guest_count: u32,
    pub dietary_notes: String,
    pub message: String,
}

impl GuestRsvpForm {
    /// Guest count and dietary notes only apply to guests who are coming.
    #[must_use]
    pub fn visible_fields(&self) -> Vec<RsvpField> {
        let mut fields = vec![
            RsvpField::Response,
            RsvpField::FullName,
            RsvpField::Phone,
            RsvpField::Email,
        ];
        if self.response == Some(RsvpStatus::Yes) {
            fields.push(RsvpField::GuestCount);
            fields.push(RsvpField::DietaryNotes);
        }
        fields.push(RsvpField::Message);
        fields
    }

    pub fn to_request(&self) -> Result<GuestRsvpRequest, RsvpValidationError> {
        let status = self.response.ok_or(RsvpValidationError::MissingResponse)?;
        let name = self.full_name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return Err(RsvpValidationError::MissingName);
        }
        let phone = non_blank(&self.phone);
        let email = non_blank(&self.email);
        if phone.is_none() && email.is_none() {
            return Err(RsvpValidationError::MissingContact);
        }

        let attending = status == RsvpStatus::Yes;
        if attending && self.guest_count > MAX_EXTRA_GUESTS {
            return Err(RsvpValidationError::TooManyGuests);
        }

        Ok(GuestRsvpRequest {
            status,
            name,
            phone,
            email,
            guests: attending.then_some(self.guest_count),
            dietary_notes: if attending {
                non_blank(&self.dietary_notes)
            } else {
                None
            },
            message: non_blank(&self.message),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GuestRsvpStatus {
    #[default]
    Editing,
    Invalid(RsvpValidationError),
    Submitting,
    Submitted,
    Failed(ApiFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestRsvpAction {
    SetResponse(RsvpStatus),
    SetFullName(String),
    SetPhone(String),
    SetEmail(String),
    SetGuestCount(u32),
    SetDietaryNotes(String),
    SetMessage(String),
    SubmitRequested,
    SubmitSucceeded,
    SubmitFailed(ApiFailure),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestRsvpState {
    pub event_id: String,
    pub form: GuestRsvpForm,
    pub status: GuestRsvpStatus,
}

impl GuestRsvpState {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == GuestRsvpStatus::Submitted
    }
}

/// Applies one form action. Returns the request to send when a submit passes
/// validation; the caller reports the outcome with `SubmitSucceeded` or
/// `SubmitFailed`.
pub fn apply_rsvp_action(
    state: &mut GuestRsvpState,
    action: GuestRsvpAction,
) -> Option<GuestRsvpRequest> {
    if state.status == GuestRsvpStatus::Submitted {
        return None;
    }

    let form = &mut state.form;
    match action {
        GuestRsvpAction::SetResponse(response) => form.response = Some(response),
        GuestRsvpAction::SetFullName(value) => form.full_name = value,
        GuestRsvpAction::SetPhone(value) => form.phone = value,
        GuestRsvpAction::SetEmail(value) => form.email = value,
        GuestRsvpAction::SetGuestCount(value) => form.guest_count = value,
        GuestRsvpAction::SetDietaryNotes(value) => form.dietary_notes = value,
        GuestRsvpAction::SetMessage(value) => form.message = value,
        GuestRsvpAction::SubmitRequested => {
            if state.status == GuestRsvpStatus::Submitting {
                return None;
            }
            return match form.to_request() {
                Ok(request) => {
                    state.status = GuestRsvpStatus::Submitting;
                    Some(request)
                }
                Err(error) => {
                    state.status = GuestRsvpStatus::Invalid(error);
                    None
                }
            };
        }
        GuestRsvpAction::SubmitSucceeded => {
            if state.status == GuestRsvpStatus::Submitting {
                state.status = GuestRsvpStatus::Submitted;
            }
            return None;
        }
        GuestRsvpAction::SubmitFailed(failure) => {
            if state.status == GuestRsvpStatus::Submitting {
                state.status = GuestRsvpStatus::Failed(failure);
            }
            return None;
        }
    }

    if state.status != GuestRsvpStatus::Submitting {
        state.status = GuestRsvpStatus::Editing;
    }
    None
}

/// Validates, posts to `/events/{id}/rsvp-guest`, and records the outcome.
pub async fn submit_guest_rsvp(client: &ApiClient, state: &mut GuestRsvpState) {
    let Some(request) = apply_rsvp_action(state, GuestRsvpAction::SubmitRequested) else {
        debug!(status = ?state.status, "guest rsvp not submitted");
        return;
    };
    let outcome = match client.submit_guest_rsvp(&state.event_id, &request).await {
        Ok(_) => {
            info!(event_id = %state.event_id, status = request.status.as_str(), "guest rsvp recorded");
            GuestRsvpAction::SubmitSucceeded
        }
        Err(error) => GuestRsvpAction::SubmitFailed(ApiFailure::from(&error)),
    };
    apply_rsvp_action(state, outcome);
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(response: RsvpStatus) -> GuestRsvpState {
        let mut state = GuestRsvpState::new("42");
        for action in [
            GuestRsvpAction::SetResponse(response),
            GuestRsvpAction::SetFullName(" Jane   Doe ".to_string()),
            GuestRsvpAction::SetPhone("0999".to_string()),
            GuestRsvpAction::SetGuestCount(2),
            GuestRsvpAction::SetDietaryNotes("vegetarian".to_string()),
        ] {
            assert_eq!(apply_rsvp_action(&mut state, action), None);
        }
        state
    }

    #[test]
    fn attending_fields_only_visible_for_yes() {
        let mut form = GuestRsvpForm::default();
        assert!(!form.visible_fields().contains(&RsvpField::GuestCount));
        form.response = Some(RsvpStatus::Yes);
        assert!(form.visible_fields().contains(&RsvpField::GuestCount));
        assert!(form.visible_fields().contains(&RsvpField::DietaryNotes));
        form.response = Some(RsvpStatus::Maybe);
        assert!(!form.visible_fields().contains(&RsvpField::DietaryNotes));
    }

    #[test]
    fn submit_builds_request_for_yes() {
        let mut state = filled(RsvpStatus::Yes);
        let request =
            apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested).expect("valid form");
        assert_eq!(request.status, RsvpStatus::Yes);
        assert_eq!(request.name, "Jane Doe");
        assert_eq!(request.phone.as_deref(), Some("0999"));
        assert_eq!(request.guests, Some(2));
        assert_eq!(request.dietary_notes.as_deref(), Some("vegetarian"));
        assert_eq!(state.status, GuestRsvpStatus::Submitting);
    }

    #[test]
    fn hidden_fields_are_dropped_for_no() {
        let mut state = filled(RsvpStatus::No);
        let request =
            apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested).expect("valid form");
        assert_eq!(request.guests, None);
        assert_eq!(request.dietary_notes, None);
    }

    #[test]
    fn validation_errors_block_submit() {
        let mut state = GuestRsvpState::new("42");
        assert_eq!(apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested), None);
        assert_eq!(
            state.status,
            GuestRsvpStatus::Invalid(RsvpValidationError::MissingResponse)
        );

        apply_rsvp_action(&mut state, GuestRsvpAction::SetResponse(RsvpStatus::Yes));
        assert_eq!(state.status, GuestRsvpStatus::Editing);
        apply_rsvp_action(&mut state, GuestRsvpAction::SetFullName("Jane".to_string()));
        apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested);
        assert_eq!(
            state.status,
            GuestRsvpStatus::Invalid(RsvpValidationError::MissingContact)
        );

        apply_rsvp_action(&mut state, GuestRsvpAction::SetEmail("jane@example.com".to_string()));
        apply_rsvp_action(&mut state, GuestRsvpAction::SetGuestCount(11));
        apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested);
        assert_eq!(
            state.status,
            GuestRsvpStatus::Invalid(RsvpValidationError::TooManyGuests)
        );
    }

    #[test]
    fn failure_then_edit_returns_to_editing() {
        let mut state = filled(RsvpStatus::Maybe);
        apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested);
        let failure = ApiFailure {
            message: "Event is full".to_string(),
            should_logout: false,
        };
        apply_rsvp_action(&mut state, GuestRsvpAction::SubmitFailed(failure.clone()));
        assert_eq!(state.status, GuestRsvpStatus::Failed(failure));

        apply_rsvp_action(&mut state, GuestRsvpAction::SetMessage("sorry".to_string()));
        assert_eq!(state.status, GuestRsvpStatus::Editing);
    }

    #[test]
    fn submitted_form_is_frozen() {
        let mut state = filled(RsvpStatus::Yes);
        apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested);
        apply_rsvp_action(&mut state, GuestRsvpAction::SubmitSucceeded);
        assert!(state.is_submitted());

        apply_rsvp_action(&mut state, GuestRsvpAction::SetFullName("Someone else".to_string()));
        assert_eq!(state.form.full_name, " Jane   Doe ");
        assert_eq!(apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested), None);
        assert!(state.is_submitted());
    }

    #[test]
    fn duplicate_submit_while_in_flight_is_ignored() {
        let mut state = filled(RsvpStatus::Yes);
        assert!(apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested).is_some());
        assert!(apply_rsvp_action(&mut state, GuestRsvpAction::SubmitRequested).is_none());
        assert_eq!(state.status, GuestRsvpStatus::Submitting);
    }
}
