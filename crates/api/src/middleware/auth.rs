//! Bearer token authentication and role checks.
//!
//! Handlers that need a caller take an [`AuthUser`] argument and then ask it
//! whether the caller may perform an [`Action`]:
//!
//! ```rust,ignore
//! async fn delete_property(user: AuthUser, ...) -> Result<StatusCode, AppError> {
//!     user.require(Action::DeleteProperties)?;
//!     ...
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use estate_desk_core::authz::{Access, Action, authorize};
use estate_desk_core::{EmployeeId, Role, UserId};

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// The authenticated caller, decoded from a verified access token.
///
/// The token is not checked against the database, so a role change or
/// deactivation takes effect when the access token expires.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
}

impl AuthUser {
    /// Access the caller has for `action`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the role is denied the action.
    pub fn require(&self, action: Action) -> Result<Access, AppError> {
        let access = authorize(self.role, action);
        if access.is_allowed() {
            Ok(access)
        } else {
            tracing::debug!(role = %self.role, ?action, "action denied");
            Err(AppError::Forbidden)
        }
    }

    /// Employee scope for `action`: `None` for unrestricted access, the
    /// caller's own employee for own-only access.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the action is denied, or is own-only
    /// and the account has no employee link.
    pub fn scope(&self, action: Action) -> Result<Option<EmployeeId>, AppError> {
        match self.require(action)? {
            Access::Own => self.employee_id.map(Some).ok_or(AppError::Forbidden),
            Access::Any | Access::Denied => Ok(None),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthenticated("authentication required".to_owned()))?;

        let claims = state.tokens().verify_access(token)?;

        Span::current().record("user_id", claims.sub.as_i32());
        set_sentry_user(claims.sub.as_i32(), &claims.email);

        Ok(Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            employee_id: claims.employee_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/visits");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn user(role: Role, employee_id: Option<i32>) -> AuthUser {
        AuthUser {
            id: UserId::new(1),
            email: "staff@example.com".to_owned(),
            role,
            employee_id: employee_id.map(EmployeeId::new),
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcg=="))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn test_scope_by_role() {
        let broker = user(Role::Broker, None);
        assert_eq!(broker.scope(Action::ReadVisits).unwrap(), None);

        let advisor = user(Role::Advisor, Some(7));
        assert_eq!(
            advisor.scope(Action::ReadVisits).unwrap(),
            Some(EmployeeId::new(7))
        );
        assert!(matches!(
            advisor.scope(Action::ManageProperties),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_advisor_without_employee_is_forbidden() {
        let advisor = user(Role::Advisor, None);
        assert!(matches!(
            advisor.scope(Action::ReadReports),
            Err(AppError::Forbidden)
        ));
    }
}
