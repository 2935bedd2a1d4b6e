use eventdesk_api_client::ApiError;

/// What a view shows for a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub message: String,
    /// The backend rejected the session; the caller usually logs out.
    pub should_logout: bool,
}

impl From<&ApiError> for ApiFailure {
    fn from(error: &ApiError) -> Self {
        Self {
            message: error.user_message(),
            should_logout: error.is_unauthenticated(),
        }
    }
}

impl From<ApiError> for ApiFailure {
    fn from(error: ApiError) -> Self {
        Self::from(&error)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Failed(ApiFailure),
}

impl<T> LoadState<T> {
    pub fn from_result(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(value) => Self::Loaded(value),
            Err(error) => Self::Failed(ApiFailure::from(&error)),
        }
    }

    pub fn begin(&mut self) {
        *self = Self::Loading;
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.failure().map(|failure| failure.message.as_str())
    }

    #[must_use]
    pub fn should_logout(&self) -> bool {
        self.failure().is_some_and(|failure| failure.should_logout)
    }
}
