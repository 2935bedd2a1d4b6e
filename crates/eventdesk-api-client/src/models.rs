//! Backend API request and response shapes.
//!
//! Read models are lenient: missing fields default, ids may arrive as numbers
//! or strings, and fields the client does not know about are kept in `extra`.

use chrono::{NaiveDate, NaiveTime};
use eventdesk_client_core::Role;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body returned by `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    /// Top-level `role`, falling back to `user.role`.
    #[must_use]
    pub fn role_label(&self) -> Option<&str> {
        self.role
            .as_deref()
            .or_else(|| self.user.as_ref().and_then(|user| user.role.as_deref()))
            .map(str::trim)
            .filter(|role| !role.is_empty())
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserSummary {
    #[serde(default, alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventRecord {
    #[serde(default, alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "startTime")]
    pub start_time: Option<String>,
    #[serde(default, alias = "endTime")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "isVirtual")]
    pub is_virtual: bool,
    #[serde(default, alias = "meetingLink")]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default, alias = "rsvpDeadline")]
    pub rsvp_deadline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "rsvpCount")]
    pub rsvp_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventRecord {
    /// Calendar day of the event, accepting a bare date or an RFC 3339 prefix.
    #[must_use]
    pub fn starts_on(&self) -> Option<NaiveDate> {
        let raw = self.date.as_deref()?.trim();
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }
}

/// Payload for creating or replacing an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub start_time: NaiveTime,
    #[serde(
        default,
        with = "optional_hour_minute",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<NaiveTime>,
    pub is_virtual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsvp_deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    Yes,
    No,
    Maybe,
}

impl RsvpStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Maybe => "maybe",
        }
    }
}

impl std::str::FromStr for RsvpStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            "maybe" => Ok(Self::Maybe),
            other => Err(format!("unknown rsvp response '{other}'")),
        }
    }
}

/// Body of `POST /events/{id}/rsvp-guest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestRsvpRequest {
    pub status: RsvpStatus,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RsvpRecord {
    #[serde(default, alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, alias = "eventId", deserialize_with = "deserialize_optional_id")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub guests: Option<u32>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Notification {
    #[serde(default, alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "isRead")]
    pub read: bool,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdminStats {
    #[serde(default, alias = "totalEvents")]
    pub total_events: u64,
    #[serde(default, alias = "totalUsers")]
    pub total_users: u64,
    #[serde(default, alias = "totalRsvps")]
    pub total_rsvps: u64,
    #[serde(default, alias = "upcomingEvents")]
    pub upcoming_events: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateUserRoleRequest {
    pub role: Role,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_optional_id(deserializer)?.unwrap_or_default())
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id)),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

mod hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        let trimmed = raw.trim();
        NaiveTime::parse_from_str(trimmed, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
    }
}

mod optional_hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => super::hour_minute::serialize(time, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => super::hour_minute::parse(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
