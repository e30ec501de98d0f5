//! Operation and commission handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use estate_desk_core::OperationId;
use estate_desk_core::authz::Action;

use crate::db::OperationRepository;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::models::Page;
use crate::models::operation::{
    NewOperationInput, Operation, OperationDetail, OperationFilter, PaymentUpdate,
};
use crate::services::OperationService;
use crate::state::AppState;

fn service(state: &AppState) -> OperationService<'_> {
    let config = state.config();
    OperationService::new(state.pool(), config.commission_split, config.default_currency)
}

#[instrument(skip(user, state))]
pub async fn index(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<OperationFilter>,
) -> Result<Json<Page<Operation>>, AppError> {
    user.require(Action::ReadOperations)?;

    let (items, total) = OperationRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Page::new(items, total, filter.paging())))
}

/// Register an operation and its commission shares.
#[instrument(skip(user, state, input))]
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewOperationInput>,
) -> Result<(StatusCode, Json<OperationDetail>), AppError> {
    user.require(Action::ManageOperations)?;
    let input = input.validate()?;

    let detail = service(&state).create(&input, user.id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[instrument(skip(user, state))]
pub async fn show(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OperationId>,
) -> Result<Json<OperationDetail>, AppError> {
    user.require(Action::ReadOperations)?;

    let repo = OperationRepository::new(state.pool());
    let operation = repo
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("operation"))?;
    let shares = repo.list_shares(id).await?;

    Ok(Json(OperationDetail { operation, shares }))
}

#[instrument(skip(user, state))]
pub async fn recompute(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OperationId>,
) -> Result<Json<OperationDetail>, AppError> {
    user.require(Action::ManageOperations)?;
    Ok(Json(service(&state).recompute(id).await?))
}

/// Close the deal: the listing becomes sold or rented.
#[instrument(skip(user, state))]
pub async fn finalize(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OperationId>,
) -> Result<Json<OperationDetail>, AppError> {
    user.require(Action::ManageOperations)?;
    Ok(Json(service(&state).finalize(id).await?))
}

#[instrument(skip(user, state))]
pub async fn update_payment(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OperationId>,
    ApiJson(body): ApiJson<PaymentUpdate>,
) -> Result<Json<Operation>, AppError> {
    user.require(Action::UpdatePaymentStatus)?;

    let operation = OperationRepository::new(state.pool())
        .update_payment_status(id, body.payment_status)
        .await?;

    tracing::info!(operation_id = %id, payment_status = %operation.payment_status, "payment status updated");
    Ok(Json(operation))
}
