//! Login, token refresh and current-user handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::models::user::User;
use crate::services::AuthService;
use crate::services::auth::TokenPair;
use crate::state::AppState;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// Password redacted.
impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Refresh request body.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair plus the account it was issued for.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: User,
}

/// Handle password login.
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let auth = AuthService::new(state.pool(), state.tokens());

    match auth.login(&form.email, &form.password).await {
        Ok((user, tokens)) => {
            tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");
            Ok(Json(SessionResponse { tokens, user }))
        }
        Err(e) => {
            tracing::info!(error = %e, "login failed");
            Err(e.into())
        }
    }
}

/// Exchange a refresh token for a new pair.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let (user, tokens) = auth.refresh(&body.refresh_token).await?;
    Ok(Json(SessionResponse { tokens, user }))
}

/// The authenticated account, read fresh from the database.
#[instrument(skip(state))]
pub async fn me(user: AuthUser, State(state): State<AppState>) -> Result<Json<User>, AppError> {
    let auth = AuthService::new(state.pool(), state.tokens());
    Ok(Json(auth.current_user(user.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_debug_redacts_password() {
        let form = LoginRequest {
            email: "broker@example.com".to_owned(),
            password: "Sup3rSecret".to_owned(),
        };
        let output = format!("{form:?}");
        assert!(output.contains("broker@example.com"));
        assert!(!output.contains("Sup3rSecret"));
    }
}
