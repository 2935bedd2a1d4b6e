//! HTTP gateway to the EventDesk backend API.
//!
//! One attempt per call: no retries, no queueing, no deduplication. A request
//! is cancelled by dropping its future; the response is then discarded.

#![cfg_attr(test, allow(clippy::expect_used))]

use std::time::Duration;

use eventdesk_client_core::auth::{
    AuthInputError, normalize_base_url, resolve_api_base_url, resolve_api_timeout_ms,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub mod models;

pub use reqwest::{Method, StatusCode};

pub use models::{
    AdminStats, AuthResponse, EventRecord, GuestRsvpRequest, LoginRequest, NewEvent,
    Notification, RegisterRequest, RsvpRecord, RsvpStatus, UpdateUserRoleRequest, UserSummary,
};

pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed. Please try again.";
/// Longest non-JSON error body shown to the user verbatim.
pub const MAX_PLAIN_TEXT_MESSAGE_CHARS: usize = 200;
pub const NETWORK_FAILURE_MESSAGE: &str =
    "Could not reach the server. Please check your connection and try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClientConfig {
    pub base_url: String,
    /// `None` keeps requests open until the server answers.
    pub timeout_ms: Option<u64>,
}

impl ApiClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: None,
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        let (base_url, source) = resolve_api_base_url()?;
        debug!(%base_url, source, "resolved api base url");
        Ok(Self {
            base_url,
            timeout_ms: resolve_api_timeout_ms()?,
        })
    }
}

/// Client value for the backend API.
///
/// The bearer token lives on the value: `set_auth_token` changes this value
/// only, and `with_auth_token` derives an independent handle. Clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Option<Duration>,
    auth_token: Option<String>,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("api_client_config_invalid:{0}")]
    Config(#[from] AuthInputError),
    #[error("api_client_invalid_path")]
    InvalidPath,
    #[error("api_request_encode_failed:{message}")]
    Encode { message: String },
    #[error("api_request_failed:{message}")]
    Network { message: String },
    #[error("api_read_failed:{message}")]
    Read { message: String },
    #[error("api_http_{status}:{}", .message.as_deref().unwrap_or("<empty>"))]
    Http {
        status: StatusCode,
        message: Option<String>,
        body: String,
    },
    #[error("api_json_decode_failed:{message}")]
    Decode { message: String },
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The backend rejected the bearer token (or its absence).
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Text for the view to show. Never empty.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Network { .. } => NETWORK_FAILURE_MESSAGE.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: config.timeout_ms.map(Duration::from_millis),
            auth_token: None,
            http: reqwest::Client::new(),
        })
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ApiClientConfig::from_env()?)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Sets or clears the bearer token for every later request on this value.
    /// Blank tokens clear it.
    pub fn set_auth_token(&mut self, token: Option<&str>) {
        self.auth_token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(ToString::to_string);
    }

    /// Derived handle carrying `token`; `self` is left untouched.
    #[must_use]
    pub fn with_auth_token(&self, token: Option<&str>) -> Self {
        let mut derived = self.clone();
        derived.set_auth_token(token);
        derived
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    #[must_use]
    pub fn event_path(event_id: &str) -> String {
        format!("/events/{}", event_id.trim())
    }

    #[must_use]
    pub fn public_event_path(event_id: &str) -> String {
        format!("/events/{}/public", event_id.trim())
    }

    #[must_use]
    pub fn guest_rsvp_path(event_id: &str) -> String {
        format!("/events/{}/rsvp-guest", event_id.trim())
    }

    #[must_use]
    pub fn event_rsvps_path(event_id: &str) -> String {
        format!("/events/{}/rsvps", event_id.trim())
    }

    #[must_use]
    pub fn admin_user_path(user_id: &str) -> String {
        format!("/admin/users/{}", user_id.trim())
    }

    #[must_use]
    pub fn admin_user_role_path(user_id: &str) -> String {
        format!("/admin/users/{}/role", user_id.trim())
    }

    #[must_use]
    pub fn notification_read_path(notification_id: &str) -> String {
        format!("/notifications/{}/read", notification_id.trim())
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post("/auth/login", request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.post("/auth/register", request).await
    }

    pub async fn me(&self) -> Result<UserSummary, ApiError> {
        let value: Value = self.get("/auth/me").await?;
        decode_wrapped(value, "user")
    }

    pub async fn list_events(&self) -> Result<Vec<EventRecord>, ApiError> {
        let value: Value = self.get("/events").await?;
        decode_list(value, "events")
    }

    pub async fn get_event(&self, event_id: &str) -> Result<EventRecord, ApiError> {
        let value: Value = self.get(Self::event_path(event_id).as_str()).await?;
        decode_wrapped(value, "event")
    }

    pub async fn create_event(&self, event: &NewEvent) -> Result<EventRecord, ApiError> {
        let value: Value = self.post("/events", event).await?;
        decode_wrapped(value, "event")
    }

    pub async fn update_event(
        &self,
        event_id: &str,
        event: &NewEvent,
    ) -> Result<EventRecord, ApiError> {
        let value: Value = self.put(Self::event_path(event_id).as_str(), event).await?;
        decode_wrapped(value, "event")
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<Value, ApiError> {
        self.delete(Self::event_path(event_id).as_str()).await
    }

    pub async fn public_event(&self, event_id: &str) -> Result<EventRecord, ApiError> {
        let value: Value = self.get(Self::public_event_path(event_id).as_str()).await?;
        decode_wrapped(value, "event")
    }

    pub async fn submit_guest_rsvp(
        &self,
        event_id: &str,
        request: &GuestRsvpRequest,
    ) -> Result<Value, ApiError> {
        self.post(Self::guest_rsvp_path(event_id).as_str(), request)
            .await
    }

    pub async fn event_rsvps(&self, event_id: &str) -> Result<Vec<RsvpRecord>, ApiError> {
        let value: Value = self.get(Self::event_rsvps_path(event_id).as_str()).await?;
        decode_list(value, "rsvps")
    }

    pub async fn rsvps(&self) -> Result<Vec<RsvpRecord>, ApiError> {
        let value: Value = self.get("/rsvps").await?;
        decode_list(value, "rsvps")
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        let value: Value = self.get("/notifications").await?;
        decode_list(value, "notifications")
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<Value, ApiError> {
        self.put(
            Self::notification_read_path(notification_id).as_str(),
            &serde_json::json!({ "read": true }),
        )
        .await
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        let value: Value = self.get("/admin/stats").await?;
        decode_wrapped(value, "stats")
    }

    pub async fn admin_events(&self) -> Result<Vec<EventRecord>, ApiError> {
        let value: Value = self.get("/admin/events").await?;
        decode_list(value, "events")
    }

    pub async fn admin_users(&self) -> Result<Vec<UserSummary>, ApiError> {
        let value: Value = self.get("/admin/users").await?;
        decode_list(value, "users")
    }

    pub async fn admin_delete_user(&self, user_id: &str) -> Result<Value, ApiError> {
        self.delete(Self::admin_user_path(user_id).as_str()).await
    }

    pub async fn admin_update_user_role(
        &self,
        user_id: &str,
        request: &UpdateUserRoleRequest,
    ) -> Result<Value, ApiError> {
        self.put(Self::admin_user_role_path(user_id).as_str(), request)
            .await
    }

    pub async fn get<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ApiError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(payload)).await
    }

    pub async fn put<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ApiError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(payload)).await
    }

    pub async fn delete<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request::<(), T>(Method::DELETE, path, None).await
    }

    /// Sends one request and decodes the JSON reply. Any non-2xx status fails.
    pub async fn request<Req, Res>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Req>,
    ) -> Result<Res, ApiError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = self.endpoint(path).ok_or(ApiError::InvalidPath)?;
        let request_id = format!("req_{}", Uuid::new_v4().simple());

        let mut request = self
            .http
            .request(method.clone(), url.as_str())
            .header("x-request-id", request_id.as_str())
            .header(ACCEPT, "application/json");
        if let Some(token) = self.auth_token.as_deref() {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        if let Some(payload) = payload {
            let body = serde_json::to_vec(payload).map_err(|error| ApiError::Encode {
                message: error.to_string(),
            })?;
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        debug!(
            %method,
            %url,
            request_id = %request_id,
            authenticated = self.auth_token.is_some(),
            "api request"
        );

        let response = request.send().await.map_err(|error| {
            warn!(%method, %url, request_id = %request_id, %error, "api request did not complete");
            ApiError::Network {
                message: error.to_string(),
            }
        })?;

        let status = response.status();
        let result = decode_json_response(response).await;
        match &result {
            Ok(_) => debug!(%method, %url, request_id = %request_id, %status, "api response"),
            Err(error) => debug!(%method, %url, request_id = %request_id, %status, %error, "api request failed"),
        }
        result
    }
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> ApiError {
    let body = String::from_utf8_lossy(body).trim().to_string();
    ApiError::Http {
        status,
        message: server_message(&body),
        body,
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Recognizes `{"error": "X"}`, `{"error": {"message": "X"}}`,
/// `{"message": "X"}` and `{"detail": "X"}`. A non-JSON body is used only
/// when it is short plain text; markup such as a proxy error page is dropped.
#[must_use]
pub fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return plain_text_message(trimmed);
    };
    let message = match &value {
        Value::String(message) => Some(message.as_str()),
        Value::Object(object) => object
            .get("error")
            .and_then(|error| match error {
                Value::String(message) => Some(message.as_str()),
                Value::Object(inner) => inner.get("message").and_then(Value::as_str),
                _ => None,
            })
            .or_else(|| object.get("message").and_then(Value::as_str))
            .or_else(|| object.get("detail").and_then(Value::as_str)),
        _ => None,
    };
    non_empty_string(message?)
}

/// Accepts a bare array or an object holding the array under `key` or `data`.
pub fn decode_list<T>(value: Value, key: &str) -> Result<Vec<T>, ApiError>
where
    T: DeserializeOwned,
{
    let list = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut object) => [key, "data", "items"]
            .iter()
            .find_map(|candidate| object.remove(*candidate).filter(Value::is_array))
            .ok_or_else(|| ApiError::Decode {
                message: format!("expected a list under '{key}'"),
            })?,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(ApiError::Decode {
                message: format!("expected a list, got {other}"),
            });
        }
    };
    serde_json::from_value(list).map_err(|error| ApiError::Decode {
        message: error.to_string(),
    })
}

/// Accepts the resource itself or an object wrapping it under `key` or `data`.
pub fn decode_wrapped<T>(value: Value, key: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let inner = match value {
        Value::Object(mut object) => {
            match [key, "data"]
                .iter()
                .find_map(|candidate| object.remove(*candidate).filter(Value::is_object))
            {
                Some(inner) => inner,
                None => Value::Object(object),
            }
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(|error| ApiError::Decode {
        message: error.to_string(),
    })
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        // The status already says what went wrong; keep it.
        Err(error) if !status.is_success() => {
            warn!(%status, %error, "failed to read error response body");
            return Err(format_http_error(status, b""));
        }
        Err(error) => {
            return Err(ApiError::Read {
                message: error.to_string(),
            });
        }
    };

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    let payload: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &bytes
    };
    serde_json::from_slice::<T>(payload).map_err(|error| ApiError::Decode {
        message: error.to_string(),
    })
}

fn plain_text_message(body: &str) -> Option<String> {
    if body.starts_with('<') || body.chars().count() > MAX_PLAIN_TEXT_MESSAGE_CHARS {
        return None;
    }
    Some(body.to_string())
}

fn non_empty_string(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
