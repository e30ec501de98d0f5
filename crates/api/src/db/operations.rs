//! Operation repository and commission share persistence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use estate_desk_core::commission::Breakdown;
use estate_desk_core::{
    ClientId, CommissionShareId, CurrencyCode, EmployeeId, OperationId, OperationKind,
    PaymentStatus, PropertyId, ShareRecipient, UserId, VisitId,
};

use super::RepositoryError;
use crate::models::operation::{CommissionShare, Operation, OperationFilter};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OperationRow {
    id: i32,
    property_id: i32,
    client_id: i32,
    visit_id: Option<i32>,
    kind: OperationKind,
    amount: Decimal,
    currency: CurrencyCode,
    commission_rate: Decimal,
    advisor_percent: Decimal,
    commission_total: Decimal,
    payment_status: PaymentStatus,
    notes: Option<String>,
    finalized_at: Option<DateTime<Utc>>,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OperationRow> for Operation {
    fn from(row: OperationRow) -> Self {
        Self {
            id: OperationId::new(row.id),
            property_id: PropertyId::new(row.property_id),
            client_id: ClientId::new(row.client_id),
            visit_id: row.visit_id.map(VisitId::new),
            kind: row.kind,
            amount: row.amount,
            currency: row.currency,
            commission_rate: row.commission_rate,
            advisor_percent: row.advisor_percent,
            commission_total: row.commission_total,
            payment_status: row.payment_status,
            notes: row.notes,
            finalized_at: row.finalized_at,
            created_by: row.created_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShareRow {
    id: i32,
    operation_id: i32,
    recipient: ShareRecipient,
    employee_id: Option<i32>,
    percent: Decimal,
    amount: Decimal,
}

impl From<ShareRow> for CommissionShare {
    fn from(row: ShareRow) -> Self {
        Self {
            id: CommissionShareId::new(row.id),
            operation_id: OperationId::new(row.operation_id),
            recipient: row.recipient,
            employee_id: row.employee_id.map(EmployeeId::new),
            percent: row.percent,
            amount: row.amount,
        }
    }
}

const OPERATION_COLUMNS: &str = "id, property_id, client_id, visit_id, kind, amount, currency, \
     commission_rate, advisor_percent, commission_total, payment_status, notes, finalized_at, \
     created_by, created_at, updated_at";

const SHARE_COLUMNS: &str = "id, operation_id, recipient, employee_id, percent, amount";

/// Fields of an operation about to be inserted.
#[derive(Debug, Clone)]
pub struct NewOperation<'a> {
    pub property_id: PropertyId,
    pub client_id: ClientId,
    pub visit_id: Option<VisitId>,
    pub kind: OperationKind,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub commission_rate: Decimal,
    pub advisor_percent: Decimal,
    pub commission_total: Decimal,
    pub notes: Option<&'a str>,
    pub created_by: UserId,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for operation reads and payment updates.
pub struct OperationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OperationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List operations, newest first. Date bounds apply to `created_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &OperationFilter,
    ) -> Result<(Vec<Operation>, i64), RepositoryError> {
        let (limit, offset) = filter.paging().limit_offset();

        let where_clause = r"
            WHERE ($1::operation_kind IS NULL OR kind = $1)
              AND ($2::payment_status IS NULL OR payment_status = $2)
              AND ($3::integer IS NULL OR property_id = $3)
              AND ($4::integer IS NULL OR client_id = $4)
              AND ($5::boolean IS NULL OR (finalized_at IS NOT NULL) = $5)
              AND ($6::date IS NULL OR created_at::date >= $6)
              AND ($7::date IS NULL OR created_at::date <= $7)
        ";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM operations {where_clause}"))
                .bind(filter.kind)
                .bind(filter.payment_status)
                .bind(filter.property_id)
                .bind(filter.client_id)
                .bind(filter.finalized)
                .bind(filter.from)
                .bind(filter.to)
                .fetch_one(self.pool)
                .await?;

        let rows: Vec<OperationRow> = sqlx::query_as(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations {where_clause}
             ORDER BY created_at DESC, id DESC LIMIT $8 OFFSET $9"
        ))
        .bind(filter.kind)
        .bind(filter.payment_status)
        .bind(filter.property_id)
        .bind(filter.client_id)
        .bind(filter.finalized)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Get an operation by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OperationId) -> Result<Option<Operation>, RepositoryError> {
        let row: Option<OperationRow> = sqlx::query_as(&format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Shares of an operation: advisors by ID, then the broker.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_shares(&self, id: OperationId) -> Result<Vec<CommissionShare>, RepositoryError> {
        let rows: Vec<ShareRow> = sqlx::query_as(&format!(
            "SELECT {SHARE_COLUMNS} FROM commission_shares WHERE operation_id = $1
             ORDER BY recipient, id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Change the payment status. Allowed on finalized operations too.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the operation doesn't exist.
    pub async fn update_payment_status(
        &self,
        id: OperationId,
        status: PaymentStatus,
    ) -> Result<Operation, RepositoryError> {
        let row: Option<OperationRow> = sqlx::query_as(&format!(
            r"
            UPDATE operations SET payment_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {OPERATION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.ok_or(RepositoryError::NotFound("operation"))?.into())
    }
}

// =============================================================================
// Commission writes (transaction-scoped)
// =============================================================================

/// Insert an operation row.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a referenced row is missing.
pub async fn insert(
    conn: &mut PgConnection,
    op: &NewOperation<'_>,
) -> Result<Operation, RepositoryError> {
    let row: OperationRow = sqlx::query_as(&format!(
        r"
        INSERT INTO operations
            (property_id, client_id, visit_id, kind, amount, currency, commission_rate,
             advisor_percent, commission_total, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {OPERATION_COLUMNS}
        "
    ))
    .bind(op.property_id)
    .bind(op.client_id)
    .bind(op.visit_id)
    .bind(op.kind)
    .bind(op.amount)
    .bind(op.currency)
    .bind(op.commission_rate)
    .bind(op.advisor_percent)
    .bind(op.commission_total)
    .bind(op.notes)
    .bind(op.created_by)
    .fetch_one(&mut *conn)
    .await
    .map_err(RepositoryError::from_constraint)?;

    Ok(row.into())
}

/// Lock an operation row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(
    conn: &mut PgConnection,
    id: OperationId,
) -> Result<Option<Operation>, RepositoryError> {
    let row: Option<OperationRow> = sqlx::query_as(&format!(
        "SELECT {OPERATION_COLUMNS} FROM operations WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Advisors holding a share of the operation, in insertion order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn share_advisors(
    conn: &mut PgConnection,
    id: OperationId,
) -> Result<Vec<EmployeeId>, RepositoryError> {
    let ids: Vec<i32> = sqlx::query_scalar(
        r"
        SELECT employee_id FROM commission_shares
        WHERE operation_id = $1 AND recipient = 'advisor' AND employee_id IS NOT NULL
        ORDER BY id
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids.into_iter().map(EmployeeId::new).collect())
}

/// Replace every share row of an operation with `breakdown` and store its
/// total.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` on a constraint violation.
pub async fn replace_shares(
    conn: &mut PgConnection,
    id: OperationId,
    breakdown: &Breakdown,
) -> Result<Vec<CommissionShare>, RepositoryError> {
    sqlx::query("DELETE FROM commission_shares WHERE operation_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("UPDATE operations SET commission_total = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(breakdown.total)
        .execute(&mut *conn)
        .await?;

    let mut shares = Vec::with_capacity(breakdown.shares.len());
    for share in &breakdown.shares {
        let row: ShareRow = sqlx::query_as(&format!(
            r"
            INSERT INTO commission_shares (operation_id, recipient, employee_id, percent, amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SHARE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(share.recipient)
        .bind(share.employee_id)
        .bind(share.percent)
        .bind(share.amount)
        .fetch_one(&mut *conn)
        .await
        .map_err(RepositoryError::from_constraint)?;
        shares.push(row.into());
    }

    Ok(shares)
}

/// Stamp `finalized_at`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the operation doesn't exist.
pub async fn mark_finalized(
    conn: &mut PgConnection,
    id: OperationId,
) -> Result<Operation, RepositoryError> {
    let row: Option<OperationRow> = sqlx::query_as(&format!(
        r"
        UPDATE operations SET finalized_at = NOW(), updated_at = NOW()
        WHERE id = $1
        RETURNING {OPERATION_COLUMNS}
        "
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.ok_or(RepositoryError::NotFound("operation"))?.into())
}

/// Shares of an operation inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn shares(
    conn: &mut PgConnection,
    id: OperationId,
) -> Result<Vec<CommissionShare>, RepositoryError> {
    let rows: Vec<ShareRow> = sqlx::query_as(&format!(
        "SELECT {SHARE_COLUMNS} FROM commission_shares WHERE operation_id = $1
         ORDER BY recipient, id"
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}
