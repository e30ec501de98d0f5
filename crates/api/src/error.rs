//! Unified error handling for the API.
//!
//! Every handler returns `Result<_, AppError>`. The response body is always
//! `{"error": <kind>, "message": <text>}`; server-side failures are logged and
//! sent to Sentry but their details never reach the client.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use estate_desk_core::DomainError;
use estate_desk_core::commission::CommissionError;
use estate_desk_core::rotation::RotationError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or rule-breaking input.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated but not allowed.
    #[error("you do not have permission to perform this action")]
    Forbidden,

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Uniqueness, double booking, invalid state change.
    #[error("{0}")]
    Conflict(String),

    /// Rotation found nobody to take a visit.
    #[error("no eligible advisor is available; assign one manually")]
    NoEligibleAdvisor,

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl AppError {
    /// Machine-readable kind used in the response body.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::NoEligibleAdvisor => "no_eligible_advisor",
            Self::Database(_) | Self::Internal(_) => "internal",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NoEligibleAdvisor => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a conflict.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(ErrorBody {
            error: self.kind(),
            message,
        });
        let mut response = (status, body).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(entity) => Self::NotFound(entity),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Database(other),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Transition(e) => Self::Conflict(e.to_string()),
            DomainError::Rotation(RotationError::NoEligibleAdvisor) => Self::NoEligibleAdvisor,
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<CommissionError> for AppError {
    fn from(err: CommissionError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RotationError> for AppError {
    fn from(err: RotationError) -> Self {
        match err {
            RotationError::NoEligibleAdvisor => Self::NoEligibleAdvisor,
        }
    }
}

impl From<estate_desk_core::TransitionError> for AppError {
    fn from(err: estate_desk_core::TransitionError) -> Self {
        Self::Conflict(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthenticated(err.to_string()),
            AuthError::InvalidToken => Self::Unauthenticated(err.to_string()),
            AuthError::WeakPassword(message) => Self::Validation(message),
            AuthError::EmployeeRequired => Self::Validation(err.to_string()),
            AuthError::InvalidEmail(e) => Self::Validation(e.to_string()),
            AuthError::EmailTaken | AuthError::LastBroker => Self::Conflict(err.to_string()),
            AuthError::Repository(e) => e.into(),
            AuthError::PasswordHash | AuthError::TokenEncoding(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: i32, email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        assert_eq!(AppError::NotFound("visit").to_string(), "visit not found");
        assert_eq!(
            AppError::validation("page_size must be positive").to_string(),
            "page_size must be positive"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::Unauthenticated("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AppError::NotFound("client")), StatusCode::NOT_FOUND);
        assert_eq!(get_status(AppError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(
            get_status(AppError::NoEligibleAdvisor),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthenticated_sets_www_authenticate() {
        let response = AppError::Unauthenticated("missing bearer token".into()).into_response();
        assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");

        let response = AppError::Forbidden.into_response();
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_repository_errors_map_to_kinds() {
        let err: AppError = RepositoryError::Conflict("email already exists".into()).into();
        assert_eq!(err.kind(), "conflict");
        let err: AppError = RepositoryError::NotFound("property").into();
        assert_eq!(err.kind(), "not_found");
        let err: AppError = RepositoryError::DataCorruption("bad row".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_domain_errors_map_to_kinds() {
        let err: AppError = DomainError::from(RotationError::NoEligibleAdvisor).into();
        assert_eq!(err.kind(), "no_eligible_advisor");

        let transition = estate_desk_core::VisitStatus::Completed
            .transition_to(estate_desk_core::VisitStatus::Cancelled)
            .unwrap_err();
        let err: AppError = DomainError::from(transition).into();
        assert_eq!(err.kind(), "conflict");

        let err: AppError = DomainError::invalid("budget_min exceeds budget_max").into();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_login_failure_is_generic() {
        let err: AppError = AuthError::InvalidCredentials.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "invalid credentials");
    }

    #[test]
    fn test_last_broker_is_conflict() {
        let err: AppError = AuthError::LastBroker.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
