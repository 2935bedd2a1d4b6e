//! Multi-step event creation.
//!
//! `Next` validates only the current step; `Back` never validates. The
//! request is assembled from the whole form once the review step submits.

use chrono::{NaiveDate, NaiveTime};
use eventdesk_api_client::{ApiClient, NewEvent};
use thiserror::Error;
use tracing::info;

use crate::view::ApiFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum WizardStep {
    #[default]
    Details,
    Schedule,
    Venue,
    Review,
}

impl WizardStep {
    pub const ALL: [Self; 4] = [Self::Details, Self::Schedule, Self::Venue, Self::Review];

    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Details => Some(Self::Schedule),
            Self::Schedule => Some(Self::Venue),
            Self::Venue => Some(Self::Review),
            Self::Review => None,
        }
    }

    #[must_use]
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Details => None,
            Self::Schedule => Some(Self::Details),
            Self::Venue => Some(Self::Schedule),
            Self::Review => Some(Self::Venue),
        }
    }

    /// One-based position for "Step 2 of 4" labels.
    #[must_use]
    pub fn number(self) -> usize {
        match self {
            Self::Details => 1,
            Self::Schedule => 2,
            Self::Venue => 3,
            Self::Review => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardValidationError {
    #[error("Please give the event a title.")]
    MissingTitle,
    #[error("Please add a short description.")]
    MissingDescription,
    #[error("Please pick a date.")]
    MissingDate,
    #[error("Please pick a start time.")]
    MissingStartTime,
    #[error("The event must end after it starts.")]
    EndBeforeStart,
    #[error("The RSVP deadline cannot be after the event date.")]
    DeadlineAfterEvent,
    #[error("Please enter a venue.")]
    MissingVenue,
    #[error("Please enter a meeting link starting with http:// or https://.")]
    InvalidMeetingLink,
    #[error("Capacity must be at least 1.")]
    InvalidCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardField {
    Title,
    Description,
    Category,
    Date,
    StartTime,
    EndTime,
    RsvpDeadline,
    IsVirtual,
    Location,
    MeetingLink,
    Capacity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub rsvp_deadline: Option<NaiveDate>,
    pub is_virtual: bool,
    pub location: String,
    pub meeting_link: String,
    pub capacity: Option<u32>,
}

impl EventDraft {
    #[must_use]
    pub fn visible_fields(&self, step: WizardStep) -> Vec<WizardField> {
        match step {
            WizardStep::Details => {
                vec![WizardField::Title, WizardField::Description, WizardField::Category]
            }
            WizardStep::Schedule => vec![
                WizardField::Date,
                WizardField::StartTime,
                WizardField::EndTime,
                WizardField::RsvpDeadline,
            ],
            WizardStep::Venue => {
                let place = if self.is_virtual {
                    WizardField::MeetingLink
                } else {
                    WizardField::Location
                };
                vec![WizardField::IsVirtual, place, WizardField::Capacity]
            }
            WizardStep::Review => Vec::new(),
        }
    }

    pub fn validate_step(&self, step: WizardStep) -> Result<(), WizardValidationError> {
        match step {
            WizardStep::Details => {
                if self.title.trim().is_empty() {
                    return Err(WizardValidationError::MissingTitle);
                }
                if self.description.trim().is_empty() {
                    return Err(WizardValidationError::MissingDescription);
                }
            }
            WizardStep::Schedule => {
                let date = self.date.ok_or(WizardValidationError::MissingDate)?;
                let start = self.start_time.ok_or(WizardValidationError::MissingStartTime)?;
                if self.end_time.is_some_and(|end| end <= start) {
                    return Err(WizardValidationError::EndBeforeStart);
                }
                if self.rsvp_deadline.is_some_and(|deadline| deadline > date) {
                    return Err(WizardValidationError::DeadlineAfterEvent);
                }
            }
            WizardStep::Venue => {
                if self.is_virtual {
                    let link = self.meeting_link.trim();
                    if !(link.starts_with("http://") || link.starts_with("https://"))
                        || link.len() <= "https://".len()
                    {
                        return Err(WizardValidationError::InvalidMeetingLink);
                    }
                } else if self.location.trim().is_empty() {
                    return Err(WizardValidationError::MissingVenue);
                }
                if self.capacity == Some(0) {
                    return Err(WizardValidationError::InvalidCapacity);
                }
            }
            WizardStep::Review => {}
        }
        Ok(())
    }

    /// Validates every step and builds the create request.
    pub fn to_request(&self) -> Result<NewEvent, WizardValidationError> {
        for step in WizardStep::ALL {
            self.validate_step(step)?;
        }
        let date = self.date.ok_or(WizardValidationError::MissingDate)?;
        let start_time = self
            .start_time
            .ok_or(WizardValidationError::MissingStartTime)?;
        Ok(NewEvent {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: non_blank(&self.category),
            date,
            start_time,
            end_time: self.end_time,
            is_virtual: self.is_virtual,
            location: if self.is_virtual {
                None
            } else {
                non_blank(&self.location)
            },
            meeting_link: if self.is_virtual {
                non_blank(&self.meeting_link)
            } else {
                None
            },
            capacity: self.capacity,
            rsvp_deadline: self.rsvp_deadline,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WizardStatus {
    #[default]
    Editing,
    Invalid(WizardValidationError),
    Submitting,
    Submitted { event_id: String },
    Failed(ApiFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardAction {
    SetTitle(String),
    SetDescription(String),
    SetCategory(String),
    SetDate(Option<NaiveDate>),
    SetStartTime(Option<NaiveTime>),
    SetEndTime(Option<NaiveTime>),
    SetRsvpDeadline(Option<NaiveDate>),
    SetVirtual(bool),
    SetLocation(String),
    SetMeetingLink(String),
    SetCapacity(Option<u32>),
    Next,
    Back,
    SubmitRequested,
    SubmitSucceeded { event_id: String },
    SubmitFailed(ApiFailure),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventWizardState {
    pub step: WizardStep,
    pub draft: EventDraft,
    pub status: WizardStatus,
}

impl EventWizardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Applies one wizard action. Returns the request when a submit from the
/// review step passes validation.
pub fn apply_wizard_action(
    state: &mut EventWizardState,
    action: WizardAction,
) -> Option<NewEvent> {
    if matches!(state.status, WizardStatus::Submitted { .. }) {
        return None;
    }
    if state.status == WizardStatus::Submitting
        && !matches!(
            action,
            WizardAction::SubmitSucceeded { .. } | WizardAction::SubmitFailed(_)
        )
    {
        return None;
    }

    let draft = &mut state.draft;
    match action {
        WizardAction::SetTitle(value) => draft.title = value,
        WizardAction::SetDescription(value) => draft.description = value,
        WizardAction::SetCategory(value) => draft.category = value,
        WizardAction::SetDate(value) => draft.date = value,
        WizardAction::SetStartTime(value) => draft.start_time = value,
        WizardAction::SetEndTime(value) => draft.end_time = value,
        WizardAction::SetRsvpDeadline(value) => draft.rsvp_deadline = value,
        WizardAction::SetVirtual(value) => draft.is_virtual = value,
        WizardAction::SetLocation(value) => draft.location = value,
        WizardAction::SetMeetingLink(value) => draft.meeting_link = value,
        WizardAction::SetCapacity(value) => draft.capacity = value,
        WizardAction::Next => match draft.validate_step(state.step) {
            Ok(()) => {
                if let Some(next) = state.step.next() {
                    state.step = next;
                }
            }
            Err(error) => {
                state.status = WizardStatus::Invalid(error);
                return None;
            }
        },
        WizardAction::Back => {
            if let Some(previous) = state.step.previous() {
                state.step = previous;
            }
        }
        WizardAction::SubmitRequested => {
            if state.step != WizardStep::Review {
                return None;
            }
            return match draft.to_request() {
                Ok(request) => {
                    state.status = WizardStatus::Submitting;
                    Some(request)
                }
                Err(error) => {
                    state.status = WizardStatus::Invalid(error);
                    None
                }
            };
        }
        WizardAction::SubmitSucceeded { event_id } => {
            if state.status == WizardStatus::Submitting {
                state.status = WizardStatus::Submitted { event_id };
            }
            return None;
        }
        WizardAction::SubmitFailed(failure) => {
            if state.status == WizardStatus::Submitting {
                state.status = WizardStatus::Failed(failure);
            }
            return None;
        }
    }

    state.status = WizardStatus::Editing;
    None
}

/// Posts the reviewed draft to `/events` and records the outcome.
pub async fn submit_event_wizard(client: &ApiClient, state: &mut EventWizardState) {
    let Some(request) = apply_wizard_action(state, WizardAction::SubmitRequested) else {
        return;
    };
    let outcome = match client.create_event(&request).await {
        Ok(event) => {
            info!(event_id = %event.id, "event created");
            WizardAction::SubmitSucceeded { event_id: event.id }
        }
        Err(error) => WizardAction::SubmitFailed(ApiFailure::from(&error)),
    };
    apply_wizard_action(state, outcome);
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
