//! Report handlers.
//!
//! Advisors get the same reports restricted to their own work.

use axum::{Json, extract::State};
use tracing::instrument;

use estate_desk_core::EmployeeId;
use estate_desk_core::authz::Action;

use crate::db::ReportRepository;
use crate::error::AppError;
use crate::extract::{ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::models::report::{
    AdvisorPerformance, AdvisorsReport, DateRange, OperationsReport, OperationsReportQuery,
    VisitsReport, VisitsReportQuery,
};
use crate::state::AppState;

#[instrument(skip(user, state))]
pub async fn operations(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OperationsReportQuery>,
) -> Result<Json<OperationsReport>, AppError> {
    let scope = user.scope(Action::ReadReports)?;
    let range = DateRange {
        from: query.from,
        to: query.to,
    }
    .validate()?;

    let aggregates = ReportRepository::new(state.pool())
        .operations(range, query.kind, scope)
        .await?;

    Ok(Json(OperationsReport {
        range,
        kind: query.kind,
        totals: aggregates.totals,
        by_kind: aggregates.by_kind,
        by_payment_status: aggregates.by_payment_status,
    }))
}

#[instrument(skip(user, state))]
pub async fn visits(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VisitsReportQuery>,
) -> Result<Json<VisitsReport>, AppError> {
    let scope = user.scope(Action::ReadReports)?;
    let range = DateRange {
        from: query.from,
        to: query.to,
    }
    .validate()?;

    let aggregates = ReportRepository::new(state.pool())
        .visits(range, query.status, scope)
        .await?;

    Ok(Json(VisitsReport {
        range,
        status: query.status,
        total: aggregates.total,
        by_status: aggregates.by_status,
        interested: aggregates.interested,
    }))
}

/// Performance of every advisor, best earner first.
#[instrument(skip(user, state))]
pub async fn advisors(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<AdvisorsReport>, AppError> {
    let scope = user.scope(Action::ReadReports)?;
    let range = range.validate()?;

    let advisors = ReportRepository::new(state.pool())
        .advisors(range, scope)
        .await?;
    Ok(Json(AdvisorsReport { range, advisors }))
}

/// One advisor's performance. Advisors may only ask for themselves.
#[instrument(skip(user, state))]
pub async fn advisor(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(employee_id): ApiPath<EmployeeId>,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<AdvisorPerformance>, AppError> {
    if let Some(own) = user.scope(Action::ReadReports)?
        && own != employee_id
    {
        return Err(AppError::Forbidden);
    }
    let range = range.validate()?;

    ReportRepository::new(state.pool())
        .advisors(range, Some(employee_id))
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or(AppError::NotFound("advisor"))
}
