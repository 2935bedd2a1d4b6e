//! The single owner of session state.
//!
//! Views never touch the persisted token or role directly. They ask the
//! context for a gate decision or an API handle, and only `login` and `logout`
//! write the session.

use eventdesk_api_client::{
    ApiClient, ApiError, AuthResponse, GENERIC_FAILURE_MESSAGE, LoginRequest, RegisterRequest,
};
use eventdesk_client_core::auth::{
    AuthInputError, normalize_display_name, normalize_email, validate_password,
};
use eventdesk_client_core::{
    AppRoute, Decision, KeyValueStore, Role, SessionGate, SessionSnapshot, clear_session,
    initial_route, persist_session,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::view::ApiFailure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Input(#[from] AuthInputError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("login response did not include a session token")]
    MissingToken,
    #[error("login response did not include a role")]
    MissingRole,
    #[error("failed to persist session: {0}")]
    Storage(String),
}

impl LoginError {
    /// Inline text for the login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Input(error) => error.to_string(),
            Self::Api(error) => error.user_message(),
            Self::MissingToken | Self::MissingRole | Self::Storage(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

#[derive(Debug)]
pub struct SessionContext<S> {
    gate: SessionGate<S>,
    client: ApiClient,
}

impl<S: KeyValueStore> SessionContext<S> {
    /// Boot: picks up whatever session was persisted before the reload.
    pub fn restore(store: S, client: ApiClient) -> Self {
        let gate = SessionGate::new(store);
        let snapshot = gate.snapshot();
        let client = client.with_auth_token(snapshot.token.as_deref());
        Self { gate, client }
    }

    /// Handle for API calls, carrying the bearer token when logged in.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> &S {
        self.gate.store()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.gate.snapshot()
    }

    pub fn authorize(&self, required: Option<Role>) -> Decision {
        self.gate.authorize(required)
    }

    pub fn navigate(&self, requested: AppRoute) -> AppRoute {
        self.gate.navigate(requested)
    }

    pub fn initial_route(&self) -> AppRoute {
        self.gate.initial_route()
    }

    /// Authenticates and persists token and role together.
    ///
    /// Returns the landing route for the new session. Nothing is persisted
    /// unless the response carries both a token and a role.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<AppRoute, LoginError> {
        let request = LoginRequest {
            email: normalize_email(&credentials.email)?,
            password: validate_password(&credentials.password)?.to_string(),
        };
        let anonymous = self.client.with_auth_token(None);
        let response = anonymous.login(&request).await?;

        let token = response.token().ok_or(LoginError::MissingToken)?;
        let role = response.role_label().ok_or(LoginError::MissingRole)?;
        if role.parse::<Role>().is_err() {
            warn!(role, "login returned an unrecognized role; role-gated views stay closed");
        }

        persist_session(self.store(), token, role)
            .map_err(|error| LoginError::Storage(error.to_string()))?;
        self.client.set_auth_token(Some(token));

        let snapshot = SessionSnapshot::new(token, role);
        info!(role, "session established");
        Ok(initial_route(&snapshot))
    }

    /// Creates an account. The caller still logs in afterwards.
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, LoginError> {
        let request = RegisterRequest {
            name: normalize_display_name(&registration.name)?,
            email: normalize_email(&registration.email)?,
            password: validate_password(&registration.password)?.to_string(),
        };
        let response = self.client.with_auth_token(None).register(&request).await?;
        info!("account registered");
        Ok(response)
    }

    /// Local and unconditional: no network call, always lands on login.
    pub fn logout(&mut self) -> AppRoute {
        self.client.set_auth_token(None);
        if let Err(error) = clear_session(self.store()) {
            warn!(%error, "failed to clear persisted session");
        }
        info!("session cleared");
        AppRoute::Login
    }

    /// Message for the failing view. Does not log out on its own.
    pub fn handle_api_error(&self, error: &ApiError) -> ApiFailure {
        let failure = ApiFailure::from(error);
        if failure.should_logout {
            warn!(%error, "backend rejected the session token");
        }
        failure
    }
}
