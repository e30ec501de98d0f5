//! Reporting types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use estate_desk_core::{
    CurrencyCode, DomainError, EmployeeId, OperationKind, PaymentStatus, VisitStatus,
};

/// Inclusive date range shared by every report.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` when `from` is after `to`.
    pub fn validate(self) -> Result<Self, DomainError> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(DomainError::invalid("from must not be after to"));
        }
        Ok(self)
    }
}

/// Query parameters for `GET /reports/operations`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OperationsReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub kind: Option<OperationKind>,
}

/// Query parameters for `GET /reports/visits`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct VisitsReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<VisitStatus>,
}

/// Totals for one currency.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CurrencyTotals {
    pub currency: CurrencyCode,
    pub operations: i64,
    pub amount: Decimal,
    pub commission: Decimal,
}

/// Count of operations per kind.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct KindCount {
    pub kind: OperationKind,
    pub operations: i64,
}

/// Count of operations per payment status.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentCount {
    pub payment_status: PaymentStatus,
    pub operations: i64,
}

/// `GET /reports/operations` response.
#[derive(Debug, Clone, Serialize)]
pub struct OperationsReport {
    pub range: DateRange,
    pub kind: Option<OperationKind>,
    pub totals: Vec<CurrencyTotals>,
    pub by_kind: Vec<KindCount>,
    pub by_payment_status: Vec<PaymentCount>,
}

/// Count of visits per status.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: VisitStatus,
    pub visits: i64,
}

/// `GET /reports/visits` response.
#[derive(Debug, Clone, Serialize)]
pub struct VisitsReport {
    pub range: DateRange,
    pub status: Option<VisitStatus>,
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    /// Completed visits where the client showed interest.
    pub interested: i64,
}

/// One advisor's performance over a range.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdvisorPerformance {
    pub employee_id: EmployeeId,
    pub name: String,
    pub visits_total: i64,
    pub visits_completed: i64,
    pub visits_cancelled: i64,
    pub clients_interested: i64,
    pub operations: i64,
    pub commission_earned: Decimal,
}

/// `GET /reports/advisors` response.
#[derive(Debug, Clone, Serialize)]
pub struct AdvisorsReport {
    pub range: DateRange,
    pub advisors: Vec<AdvisorPerformance>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_range_validation() {
        let from = NaiveDate::from_ymd_opt(2025, 3, 10);
        let to = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert!(DateRange { from, to }.validate().is_err());
        assert!(DateRange { from: to, to: from }.validate().is_ok());
        assert!(DateRange::default().validate().is_ok());
    }
}
