//! Aggregate queries behind the report endpoints.
//!
//! Every query accepts an optional employee scope. When set, only rows tied
//! to that advisor are counted: operations where they hold a share, visits
//! assigned to them, and their own performance row.

use sqlx::PgPool;

use estate_desk_core::{EmployeeId, OperationKind, VisitStatus};

use super::RepositoryError;
use crate::models::report::{
    AdvisorPerformance, CurrencyTotals, DateRange, KindCount, PaymentCount, StatusCount,
};

/// Operation aggregates for one range.
#[derive(Debug, Clone)]
pub struct OperationAggregates {
    pub totals: Vec<CurrencyTotals>,
    pub by_kind: Vec<KindCount>,
    pub by_payment_status: Vec<PaymentCount>,
}

/// Visit aggregates for one range.
#[derive(Debug, Clone)]
pub struct VisitAggregates {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub interested: i64,
}

const OPERATION_SCOPE: &str = r"
    WHERE ($1::date IS NULL OR o.created_at::date >= $1)
      AND ($2::date IS NULL OR o.created_at::date <= $2)
      AND ($3::operation_kind IS NULL OR o.kind = $3)
      AND ($4::integer IS NULL OR EXISTS (
            SELECT 1 FROM commission_shares s
            WHERE s.operation_id = o.id AND s.recipient = 'advisor' AND s.employee_id = $4))
";

const VISIT_SCOPE: &str = r"
    WHERE ($1::date IS NULL OR v.scheduled_at::date >= $1)
      AND ($2::date IS NULL OR v.scheduled_at::date <= $2)
      AND ($3::visit_status IS NULL OR v.status = $3)
      AND ($4::integer IS NULL OR v.advisor_id = $4)
";

/// Repository for report aggregates.
pub struct ReportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Operation counts and sums, grouped three ways.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn operations(
        &self,
        range: DateRange,
        kind: Option<OperationKind>,
        scope: Option<EmployeeId>,
    ) -> Result<OperationAggregates, RepositoryError> {
        let totals: Vec<CurrencyTotals> = sqlx::query_as(&format!(
            r"
            SELECT o.currency, COUNT(*) AS operations,
                   COALESCE(SUM(o.amount), 0) AS amount,
                   COALESCE(SUM(o.commission_total), 0) AS commission
            FROM operations o {OPERATION_SCOPE}
            GROUP BY o.currency ORDER BY o.currency
            "
        ))
        .bind(range.from)
        .bind(range.to)
        .bind(kind)
        .bind(scope)
        .fetch_all(self.pool)
        .await?;

        let by_kind: Vec<KindCount> = sqlx::query_as(&format!(
            r"
            SELECT o.kind, COUNT(*) AS operations
            FROM operations o {OPERATION_SCOPE}
            GROUP BY o.kind ORDER BY o.kind
            "
        ))
        .bind(range.from)
        .bind(range.to)
        .bind(kind)
        .bind(scope)
        .fetch_all(self.pool)
        .await?;

        let by_payment_status: Vec<PaymentCount> = sqlx::query_as(&format!(
            r"
            SELECT o.payment_status, COUNT(*) AS operations
            FROM operations o {OPERATION_SCOPE}
            GROUP BY o.payment_status ORDER BY o.payment_status
            "
        ))
        .bind(range.from)
        .bind(range.to)
        .bind(kind)
        .bind(scope)
        .fetch_all(self.pool)
        .await?;

        Ok(OperationAggregates {
            totals,
            by_kind,
            by_payment_status,
        })
    }

    /// Visit counts per status plus interested clients.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn visits(
        &self,
        range: DateRange,
        status: Option<VisitStatus>,
        scope: Option<EmployeeId>,
    ) -> Result<VisitAggregates, RepositoryError> {
        let by_status: Vec<StatusCount> = sqlx::query_as(&format!(
            r"
            SELECT v.status, COUNT(*) AS visits
            FROM visits v {VISIT_SCOPE}
            GROUP BY v.status ORDER BY v.status
            "
        ))
        .bind(range.from)
        .bind(range.to)
        .bind(status)
        .bind(scope)
        .fetch_all(self.pool)
        .await?;

        let interested: i64 = sqlx::query_scalar(&format!(
            r"
            SELECT COUNT(*) FROM visits v {VISIT_SCOPE}
              AND v.status = 'completed' AND v.client_interested
            "
        ))
        .bind(range.from)
        .bind(range.to)
        .bind(status)
        .bind(scope)
        .fetch_one(self.pool)
        .await?;

        let total = by_status.iter().map(|s| s.visits).sum();

        Ok(VisitAggregates {
            total,
            by_status,
            interested,
        })
    }

    /// Per-advisor visit and commission figures, top earners first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn advisors(
        &self,
        range: DateRange,
        scope: Option<EmployeeId>,
    ) -> Result<Vec<AdvisorPerformance>, RepositoryError> {
        let rows: Vec<AdvisorPerformance> = sqlx::query_as(
            r"
            SELECT e.id AS employee_id,
                   e.first_names || ' ' || e.last_names AS name,
                   v.total AS visits_total,
                   v.completed AS visits_completed,
                   v.cancelled AS visits_cancelled,
                   v.interested AS clients_interested,
                   c.operations,
                   c.earned AS commission_earned
            FROM employees e
            JOIN users u ON u.employee_id = e.id AND u.role = 'advisor'
            CROSS JOIN LATERAL (
                SELECT COUNT(*) AS total,
                       COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                       COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                       COUNT(*) FILTER (WHERE status = 'completed' AND client_interested) AS interested
                FROM visits
                WHERE advisor_id = e.id
                  AND ($1::date IS NULL OR scheduled_at::date >= $1)
                  AND ($2::date IS NULL OR scheduled_at::date <= $2)
            ) v
            CROSS JOIN LATERAL (
                SELECT COUNT(DISTINCT s.operation_id) AS operations,
                       COALESCE(SUM(s.amount), 0) AS earned
                FROM commission_shares s
                JOIN operations o ON o.id = s.operation_id
                WHERE s.employee_id = e.id AND s.recipient = 'advisor'
                  AND ($1::date IS NULL OR o.created_at::date >= $1)
                  AND ($2::date IS NULL OR o.created_at::date <= $2)
            ) c
            WHERE ($3::integer IS NULL OR e.id = $3)
            ORDER BY c.earned DESC, v.completed DESC, e.id
            ",
        )
        .bind(range.from)
        .bind(range.to)
        .bind(scope)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
