//! Staff profile handlers.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::instrument;

use estate_desk_core::EmployeeId;
use estate_desk_core::authz::Action;

use crate::db::EmployeeRepository;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::models::Page;
use crate::models::employee::{Employee, EmployeeFilter, EmployeeInput};
use crate::state::AppState;

#[instrument(skip(user, state))]
pub async fn index(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<EmployeeFilter>,
) -> Result<Json<Page<Employee>>, AppError> {
    user.require(Action::ReadEmployees)?;

    let (items, total) = EmployeeRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Page::new(items, total, filter.paging())))
}

#[instrument(skip(user, state, input))]
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<EmployeeInput>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    user.require(Action::ManageEmployees)?;
    let input = input.validate(Utc::now().date_naive())?;

    let employee = EmployeeRepository::new(state.pool()).create(&input).await?;
    tracing::info!(employee_id = %employee.id, "employee created");
    Ok((StatusCode::CREATED, Json(employee)))
}

#[instrument(skip(user, state))]
pub async fn show(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EmployeeId>,
) -> Result<Json<Employee>, AppError> {
    user.require(Action::ReadEmployees)?;

    EmployeeRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("employee"))
}

#[instrument(skip(user, state, input))]
pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EmployeeId>,
    ApiJson(input): ApiJson<EmployeeInput>,
) -> Result<Json<Employee>, AppError> {
    user.require(Action::ManageEmployees)?;
    let input = input.validate(Utc::now().date_naive())?;

    let employee = EmployeeRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(employee))
}
