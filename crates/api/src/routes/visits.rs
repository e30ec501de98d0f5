//! Visit scheduling handlers.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::instrument;

use estate_desk_core::VisitId;
use estate_desk_core::authz::Action;

use crate::db::VisitRepository;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::models::Page;
use crate::models::visit::{
    AssignInput, CancelInput, NewVisitInput, OutcomeInput, RescheduleInput, Visit, VisitFilter,
};
use crate::services::VisitService;
use crate::state::AppState;

/// List visits by start time. Advisors only get their own.
#[instrument(skip(user, state))]
pub async fn index(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(mut filter): ApiQuery<VisitFilter>,
) -> Result<Json<Page<Visit>>, AppError> {
    if let Some(own) = user.scope(Action::ReadVisits)? {
        filter.advisor_id = Some(own);
    }

    let (items, total) = VisitRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Page::new(items, total, filter.paging())))
}

/// Schedule a visit. Without `advisor_id` the advisor is chosen by rotation.
#[instrument(skip(user, state, input))]
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewVisitInput>,
) -> Result<(StatusCode, Json<Visit>), AppError> {
    user.require(Action::ScheduleVisits)?;
    let (input, slot) = input.validate(Utc::now())?;

    let visit = VisitService::new(state.pool())
        .schedule(&input, slot, user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

#[instrument(skip(user, state))]
pub async fn show(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VisitId>,
) -> Result<Json<Visit>, AppError> {
    let scope = user.scope(Action::ReadVisits)?;
    let visit = VisitRepository::new(state.pool()).get_by_id(id).await?;

    match (visit, scope) {
        (Some(v), Some(own)) if v.advisor_id != own => Err(AppError::Forbidden),
        (Some(v), _) => Ok(Json(v)),
        (None, Some(_)) => Err(AppError::Forbidden),
        (None, None) => Err(AppError::NotFound("visit")),
    }
}

#[instrument(skip(user, state, input))]
pub async fn record_outcome(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VisitId>,
    ApiJson(input): ApiJson<OutcomeInput>,
) -> Result<Json<Visit>, AppError> {
    let scope = user.scope(Action::RecordVisitOutcome)?;
    let input = input.validate()?;

    let visit = VisitService::new(state.pool())
        .record_outcome(id, &input, scope)
        .await?;
    Ok(Json(visit))
}

#[instrument(skip(user, state))]
pub async fn reschedule(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VisitId>,
    ApiJson(body): ApiJson<RescheduleInput>,
) -> Result<Json<Visit>, AppError> {
    user.require(Action::ScheduleVisits)?;

    let current = VisitRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("visit"))?;
    let slot = body.slot(current.duration_minutes, Utc::now())?;

    let visit = VisitService::new(state.pool()).reschedule(id, slot).await?;
    Ok(Json(visit))
}

#[instrument(skip(user, state, body))]
pub async fn cancel(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VisitId>,
    ApiJson(body): ApiJson<CancelInput>,
) -> Result<Json<Visit>, AppError> {
    user.require(Action::ScheduleVisits)?;
    let body = body.validate()?;

    let visit = VisitService::new(state.pool())
        .cancel(id, body.reason.as_deref())
        .await?;
    Ok(Json(visit))
}

/// Hand a visit to another advisor without moving the rotation.
#[instrument(skip(user, state))]
pub async fn assign(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VisitId>,
    ApiJson(body): ApiJson<AssignInput>,
) -> Result<Json<Visit>, AppError> {
    user.require(Action::ScheduleVisits)?;

    let visit = VisitService::new(state.pool())
        .reassign(id, body.advisor_id)
        .await?;
    Ok(Json(visit))
}
