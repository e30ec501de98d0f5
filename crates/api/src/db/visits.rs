//! Visit repository and the transaction-scoped scheduling queries.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use estate_desk_core::rotation::TimeSlot;
use estate_desk_core::{ClientId, EmployeeId, PropertyId, UserId, VisitId, VisitStatus};

use super::RepositoryError;
use crate::models::visit::{Visit, VisitFilter};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct VisitRow {
    id: i32,
    property_id: i32,
    client_id: i32,
    advisor_id: i32,
    scheduled_at: DateTime<Utc>,
    duration_minutes: i32,
    status: VisitStatus,
    notes: Option<String>,
    outcome_notes: Option<String>,
    client_interested: Option<bool>,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VisitRow> for Visit {
    fn from(row: VisitRow) -> Self {
        Self {
            id: VisitId::new(row.id),
            property_id: PropertyId::new(row.property_id),
            client_id: ClientId::new(row.client_id),
            advisor_id: EmployeeId::new(row.advisor_id),
            scheduled_at: row.scheduled_at,
            duration_minutes: row.duration_minutes,
            status: row.status,
            notes: row.notes,
            outcome_notes: row.outcome_notes,
            client_interested: row.client_interested,
            created_by: row.created_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const VISIT_COLUMNS: &str = "id, property_id, client_id, advisor_id, scheduled_at, \
     duration_minutes, status, notes, outcome_notes, client_interested, created_by, \
     created_at, updated_at";

/// Fields of a visit about to be inserted.
#[derive(Debug, Clone)]
pub struct NewVisit<'a> {
    pub property_id: PropertyId,
    pub client_id: ClientId,
    pub advisor_id: EmployeeId,
    pub slot: TimeSlot,
    pub notes: Option<&'a str>,
    pub created_by: UserId,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for visit reads.
pub struct VisitRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VisitRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List visits by start time, soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &VisitFilter) -> Result<(Vec<Visit>, i64), RepositoryError> {
        let (limit, offset) = filter.paging().limit_offset();

        let where_clause = r"
            WHERE ($1::visit_status IS NULL OR status = $1)
              AND ($2::integer IS NULL OR advisor_id = $2)
              AND ($3::integer IS NULL OR property_id = $3)
              AND ($4::integer IS NULL OR client_id = $4)
              AND ($5::timestamptz IS NULL OR scheduled_at >= $5)
              AND ($6::timestamptz IS NULL OR scheduled_at < $6)
        ";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM visits {where_clause}"))
            .bind(filter.status)
            .bind(filter.advisor_id)
            .bind(filter.property_id)
            .bind(filter.client_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(self.pool)
            .await?;

        let rows: Vec<VisitRow> = sqlx::query_as(&format!(
            "SELECT {VISIT_COLUMNS} FROM visits {where_clause}
             ORDER BY scheduled_at, id LIMIT $7 OFFSET $8"
        ))
        .bind(filter.status)
        .bind(filter.advisor_id)
        .bind(filter.property_id)
        .bind(filter.client_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Get a visit by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: VisitId) -> Result<Option<Visit>, RepositoryError> {
        let row: Option<VisitRow> =
            sqlx::query_as(&format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Into::into))
    }
}

// =============================================================================
// Scheduling (transaction-scoped)
// =============================================================================

/// Of `advisors`, those with an open visit overlapping `slot`.
///
/// `excluding` skips one visit, so a reschedule does not collide with itself.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn busy_advisors(
    conn: &mut PgConnection,
    advisors: &[EmployeeId],
    slot: TimeSlot,
    excluding: Option<VisitId>,
) -> Result<Vec<EmployeeId>, RepositoryError> {
    let ids: Vec<i32> = advisors.iter().map(EmployeeId::as_i32).collect();

    let busy: Vec<i32> = sqlx::query_scalar(
        r"
        SELECT DISTINCT advisor_id FROM visits
        WHERE advisor_id = ANY($1)
          AND status IN ('scheduled', 'rescheduled')
          AND ($4::integer IS NULL OR id <> $4)
          AND scheduled_at < $3
          AND $2 < scheduled_at + make_interval(mins => duration_minutes)
        ",
    )
    .bind(&ids)
    .bind(slot.start)
    .bind(slot.end())
    .bind(excluding)
    .fetch_all(&mut *conn)
    .await?;

    Ok(busy.into_iter().map(EmployeeId::new).collect())
}

/// Insert a scheduled visit.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a referenced row is missing.
pub async fn insert(conn: &mut PgConnection, visit: &NewVisit<'_>) -> Result<Visit, RepositoryError> {
    let row: VisitRow = sqlx::query_as(&format!(
        r"
        INSERT INTO visits
            (property_id, client_id, advisor_id, scheduled_at, duration_minutes, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {VISIT_COLUMNS}
        "
    ))
    .bind(visit.property_id)
    .bind(visit.client_id)
    .bind(visit.advisor_id)
    .bind(visit.slot.start)
    .bind(visit.slot.minutes)
    .bind(visit.notes)
    .bind(visit.created_by)
    .fetch_one(&mut *conn)
    .await
    .map_err(RepositoryError::from_constraint)?;

    Ok(row.into())
}

/// Lock a visit row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(conn: &mut PgConnection, id: VisitId) -> Result<Option<Visit>, RepositoryError> {
    let row: Option<VisitRow> = sqlx::query_as(&format!(
        "SELECT {VISIT_COLUMNS} FROM visits WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Move a visit to a new slot and mark it rescheduled.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the visit doesn't exist.
pub async fn reschedule(
    conn: &mut PgConnection,
    id: VisitId,
    slot: TimeSlot,
) -> Result<Visit, RepositoryError> {
    let row: Option<VisitRow> = sqlx::query_as(&format!(
        r"
        UPDATE visits SET
            scheduled_at = $2, duration_minutes = $3, status = 'rescheduled', updated_at = NOW()
        WHERE id = $1
        RETURNING {VISIT_COLUMNS}
        "
    ))
    .bind(id)
    .bind(slot.start)
    .bind(slot.minutes)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.ok_or(RepositoryError::NotFound("visit"))?.into())
}

/// Cancel a visit, appending the reason to its notes.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the visit doesn't exist.
pub async fn cancel(
    conn: &mut PgConnection,
    id: VisitId,
    reason: Option<&str>,
) -> Result<Visit, RepositoryError> {
    let row: Option<VisitRow> = sqlx::query_as(&format!(
        r"
        UPDATE visits SET
            status = 'cancelled',
            notes = CASE WHEN $2::text IS NULL THEN notes
                         ELSE concat_ws(E'\n', notes, 'Cancelled: ' || $2) END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {VISIT_COLUMNS}
        "
    ))
    .bind(id)
    .bind(reason)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.ok_or(RepositoryError::NotFound("visit"))?.into())
}

/// Mark a visit completed with its outcome.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the visit doesn't exist.
pub async fn complete(
    conn: &mut PgConnection,
    id: VisitId,
    outcome_notes: Option<&str>,
    client_interested: bool,
) -> Result<Visit, RepositoryError> {
    let row: Option<VisitRow> = sqlx::query_as(&format!(
        r"
        UPDATE visits SET
            status = 'completed', outcome_notes = $2, client_interested = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {VISIT_COLUMNS}
        "
    ))
    .bind(id)
    .bind(outcome_notes)
    .bind(client_interested)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.ok_or(RepositoryError::NotFound("visit"))?.into())
}

/// Hand a visit to another advisor.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the visit doesn't exist.
pub async fn reassign(
    conn: &mut PgConnection,
    id: VisitId,
    advisor: EmployeeId,
) -> Result<Visit, RepositoryError> {
    let row: Option<VisitRow> = sqlx::query_as(&format!(
        "UPDATE visits SET advisor_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {VISIT_COLUMNS}"
    ))
    .bind(id)
    .bind(advisor)
    .fetch_optional(&mut *conn)
    .await
    .map_err(RepositoryError::from_constraint)?;

    Ok(row.ok_or(RepositoryError::NotFound("visit"))?.into())
}

/// Get a visit inside a transaction without locking it.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(conn: &mut PgConnection, id: VisitId) -> Result<Option<Visit>, RepositoryError> {
    let row: Option<VisitRow> =
        sqlx::query_as(&format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(row.map(Into::into))
}
