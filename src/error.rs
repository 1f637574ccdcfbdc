use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{registry::RegistryError, session::SessionError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Display name already used in the session.
    #[error("the name `{0}` is already taken")]
    DuplicateName(String),
    /// No live session uses this join code.
    #[error("no game found for code {0}")]
    SessionNotFound(String),
    /// The session left the lobby.
    #[error("the game has already started")]
    AlreadyStarted,
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The game record could not be stored.
    #[error("failed to save game: {0}")]
    Persistence(String),
    /// Every join code is in use.
    #[error("no free join code is available")]
    CodeSpaceExhausted,
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {}", err))
    }
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::CodeSpaceExhausted => ServiceError::CodeSpaceExhausted,
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::DuplicateName(name) => ServiceError::DuplicateName(name),
            SessionError::AlreadyStarted => ServiceError::AlreadyStarted,
            SessionError::InvalidOption(option) => {
                ServiceError::InvalidInput(format!("option {option} does not exist"))
            }
            other => ServiceError::InvalidState(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::SessionNotFound(pin) => AppError::NotFound(format!("game {pin}")),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            err @ (ServiceError::DuplicateName(_)
            | ServiceError::AlreadyStarted
            | ServiceError::InvalidState(_)) => AppError::Conflict(err.to_string()),
            ServiceError::Persistence(message) => AppError::Internal(message),
            ServiceError::CodeSpaceExhausted => {
                AppError::ServiceUnavailable("no free join code".into())
            }
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_map_onto_the_service_taxonomy() {
        assert!(matches!(
            ServiceError::from(SessionError::DuplicateName("Alice".into())),
            ServiceError::DuplicateName(name) if name == "Alice"
        ));
        assert!(matches!(
            ServiceError::from(SessionError::AlreadyStarted),
            ServiceError::AlreadyStarted
        ));
        assert!(matches!(
            ServiceError::from(SessionError::NotHost),
            ServiceError::InvalidState(_)
        ));
    }

    #[test]
    fn degraded_mode_is_a_503() {
        let response = AppError::from(ServiceError::Degraded).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
