//! Login account management (broker only).

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use estate_desk_core::authz::Action;
use estate_desk_core::UserId;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::models::Page;
use crate::models::user::{ActiveUpdate, NewUserInput, RoleUpdate, User, UserFilter};
use crate::services::AccountService;
use crate::state::AppState;

/// List accounts.
#[instrument(skip(user, state))]
pub async fn index(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> Result<Json<Page<User>>, AppError> {
    user.require(Action::ManageUsers)?;

    let (items, total) = UserRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Page::new(items, total, filter.paging())))
}

/// Register an account.
#[instrument(skip(user, state, input), fields(email = %input.email, role = %input.role))]
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewUserInput>,
) -> Result<(StatusCode, Json<User>), AppError> {
    user.require(Action::ManageUsers)?;

    let created = AccountService::new(state.pool()).register(&input).await?;

    tracing::info!(user_id = %created.id, created_by = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Change an account's role.
///
/// Advisors must be linked to an employee, and the last active broker
/// cannot be demoted.
#[instrument(skip(user, state))]
pub async fn update_role(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<RoleUpdate>,
) -> Result<Json<User>, AppError> {
    user.require(Action::AssignRoles)?;

    let updated = AccountService::new(state.pool())
        .change_role(id, body.role)
        .await?;
    Ok(Json(updated))
}

/// Activate or deactivate an account.
#[instrument(skip(user, state))]
pub async fn set_active(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<ActiveUpdate>,
) -> Result<Json<User>, AppError> {
    user.require(Action::ManageUsers)?;

    let updated = AccountService::new(state.pool())
        .set_active(id, body.active)
        .await?;
    Ok(Json(updated))
}
