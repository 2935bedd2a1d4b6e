use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const ENV_API_BASE_URL: &str = "EVENTDESK_API_BASE_URL";
pub const ENV_API_BASE_URL_SHORT: &str = "EVENTDESK_API_URL";
pub const ENV_API_TIMEOUT_MS: &str = "EVENTDESK_API_TIMEOUT_MS";
pub const API_BASE_SOURCE_DEFAULT_LOCAL: &str = "default_local";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthInputError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("email must contain a single @ with text on both sides")]
    InvalidEmail,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("name must not be empty")]
    EmptyName,
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("invalid {ENV_API_TIMEOUT_MS} value '{0}'")]
    InvalidTimeout(String),
}

/// Coarse client-side label used to pick which dashboard to render.
///
/// Not a permission: the backend enforces real authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Exact match against a persisted role label. Unknown labels never match.
    #[must_use]
    pub fn matches_label(self, label: &str) -> bool {
        label == self.as_str()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthInputError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(AuthInputError::UnknownRole(other.to_string())),
        }
    }
}

pub fn resolve_api_base_url() -> Result<(String, &'static str), AuthInputError> {
    if let Some(base_url) = env_non_empty(ENV_API_BASE_URL) {
        return normalize_base_url(&base_url).map(|normalized| (normalized, ENV_API_BASE_URL));
    }
    if let Some(base_url) = env_non_empty(ENV_API_BASE_URL_SHORT) {
        return normalize_base_url(&base_url)
            .map(|normalized| (normalized, ENV_API_BASE_URL_SHORT));
    }
    normalize_base_url(DEFAULT_API_BASE_URL)
        .map(|normalized| (normalized, API_BASE_SOURCE_DEFAULT_LOCAL))
}

/// Reads the opt-in request timeout. Unset means no timeout.
pub fn resolve_api_timeout_ms() -> Result<Option<u64>, AuthInputError> {
    let Some(raw) = env_non_empty(ENV_API_TIMEOUT_MS) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(AuthInputError::InvalidTimeout(raw)),
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, AuthInputError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthInputError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AuthInputError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(AuthInputError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(AuthInputError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}

pub fn normalize_email(raw: &str) -> Result<String, AuthInputError> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(AuthInputError::EmptyEmail);
    }
    let mut parts = normalized.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AuthInputError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() {
        return Err(AuthInputError::InvalidEmail);
    }
    Ok(normalized)
}

/// Passwords are sent as typed; only an all-whitespace value is rejected.
pub fn validate_password(raw: &str) -> Result<&str, AuthInputError> {
    if raw.trim().is_empty() {
        return Err(AuthInputError::EmptyPassword);
    }
    Ok(raw)
}

pub fn normalize_display_name(raw: &str) -> Result<String, AuthInputError> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(AuthInputError::EmptyName);
    }
    Ok(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn with_env<T>(
        primary: Option<&str>,
        short: Option<&str>,
        timeout: Option<&str>,
        test: impl FnOnce() -> T,
    ) -> T {
        let lock = ENV_LOCK.get_or_init(|| Mutex::new(()));
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let keys = [ENV_API_BASE_URL, ENV_API_BASE_URL_SHORT, ENV_API_TIMEOUT_MS];
        let previous = keys.map(|key| std::env::var(key).ok());

        for (key, value) in keys.iter().zip([primary, short, timeout]) {
            if let Some(value) = value {
                unsafe { std::env::set_var(key, value) };
            } else {
                unsafe { std::env::remove_var(key) };
            }
        }

        let result = test();

        for (key, value) in keys.iter().zip(previous) {
            if let Some(value) = value {
                unsafe { std::env::set_var(key, value) };
            } else {
                unsafe { std::env::remove_var(key) };
            }
        }

        result
    }

    #[test]
    fn role_labels_parse_exactly() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!(
            "Admin".parse::<Role>(),
            Err(AuthInputError::UnknownRole("Admin".to_string()))
        );
        assert!(!Role::Admin.matches_label(" admin"));
        assert!(Role::User.matches_label("user"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let encoded = serde_json::to_string(&Role::Admin).expect("encode role");
        assert_eq!(encoded, "\"admin\"");
    }

    #[test]
    fn normalize_base_url_trims_and_drops_trailing_slash() {
        let normalized =
            normalize_base_url(" https://events.example.com/api/ ").expect("valid base url");
        assert_eq!(normalized, "https://events.example.com/api");
    }

    #[test]
    fn normalize_base_url_requires_http_scheme() {
        let error = normalize_base_url("events.example.com").expect_err("expected invalid url");
        assert_eq!(error, AuthInputError::InvalidBaseUrl);
        let error = normalize_base_url("http:///api").expect_err("expected missing host");
        assert_eq!(error, AuthInputError::InvalidBaseUrl);
    }

    #[test]
    fn resolve_api_base_url_defaults_local() {
        with_env(None, None, None, || {
            let (resolved, source) = resolve_api_base_url().expect("default local url");
            assert_eq!(resolved, DEFAULT_API_BASE_URL);
            assert_eq!(source, API_BASE_SOURCE_DEFAULT_LOCAL);
        });
    }

    #[test]
    fn resolve_api_base_url_prefers_primary_env() {
        with_env(
            Some("https://staging.example.com/api/"),
            Some("https://short.example.com"),
            None,
            || {
                let (resolved, source) = resolve_api_base_url().expect("env url");
                assert_eq!(resolved, "https://staging.example.com/api");
                assert_eq!(source, ENV_API_BASE_URL);
            },
        );
    }

    #[test]
    fn resolve_api_base_url_uses_short_env_when_primary_missing() {
        with_env(None, Some("https://short.example.com/"), None, || {
            let (resolved, source) = resolve_api_base_url().expect("short env url");
            assert_eq!(resolved, "https://short.example.com");
            assert_eq!(source, ENV_API_BASE_URL_SHORT);
        });
    }

    #[test]
    fn resolve_api_timeout_is_opt_in() {
        with_env(None, None, None, || {
            assert_eq!(resolve_api_timeout_ms(), Ok(None));
        });
        with_env(None, None, Some("2500"), || {
            assert_eq!(resolve_api_timeout_ms(), Ok(Some(2500)));
        });
        with_env(None, None, Some("0"), || {
            assert_eq!(resolve_api_timeout_ms(), Ok(None));
        });
        with_env(None, None, Some("soon"), || {
            assert_eq!(
                resolve_api_timeout_ms(),
                Err(AuthInputError::InvalidTimeout("soon".to_string()))
            );
        });
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        let normalized = normalize_email("  Jane.Doe@Example.com ").expect("valid email");
        assert_eq!(normalized, "jane.doe@example.com");
    }

    #[test]
    fn normalize_email_rejects_missing_parts() {
        assert_eq!(normalize_email("   "), Err(AuthInputError::EmptyEmail));
        assert_eq!(normalize_email("jane"), Err(AuthInputError::InvalidEmail));
        assert_eq!(normalize_email("@example.com"), Err(AuthInputError::InvalidEmail));
        assert_eq!(normalize_email("a@b@c"), Err(AuthInputError::InvalidEmail));
    }

    #[test]
    fn password_is_kept_verbatim() {
        assert_eq!(validate_password(" secret "), Ok(" secret "));
        assert_eq!(validate_password("  "), Err(AuthInputError::EmptyPassword));
    }

    #[test]
    fn display_name_collapses_whitespace() {
        assert_eq!(
            normalize_display_name("  Jane   Doe "),
            Ok("Jane Doe".to_string())
        );
        assert_eq!(normalize_display_name(" "), Err(AuthInputError::EmptyName));
    }
}
