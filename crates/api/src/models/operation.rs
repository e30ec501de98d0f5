//! Closed deal and commission share types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use estate_desk_core::{
    ClientId, CommissionShareId, CurrencyCode, DomainError, EmployeeId, OperationId,
    OperationKind, PaymentStatus, Percentage, PropertyId, ShareRecipient, UserId, VisitId,
};

use super::{PageParams, optional_text};

/// A sale, rental or anticresis deal (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub id: OperationId,
    pub property_id: PropertyId,
    pub client_id: ClientId,
    pub visit_id: Option<VisitId>,
    pub kind: OperationKind,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    /// Rate snapshot taken when the operation was created.
    pub commission_rate: Decimal,
    /// Advisor pool snapshot taken when the operation was created.
    pub advisor_percent: Decimal,
    pub commission_total: Decimal,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Operation {
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }
}

/// One participant's part of an operation's commission.
#[derive(Debug, Clone, Serialize)]
pub struct CommissionShare {
    pub id: CommissionShareId,
    pub operation_id: OperationId,
    pub recipient: ShareRecipient,
    pub employee_id: Option<EmployeeId>,
    pub percent: Decimal,
    pub amount: Decimal,
}

/// An operation with its commission shares.
#[derive(Debug, Clone, Serialize)]
pub struct OperationDetail {
    #[serde(flatten)]
    pub operation: Operation,
    pub shares: Vec<CommissionShare>,
}

/// Request body for `POST /operations`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOperationInput {
    pub property_id: PropertyId,
    pub client_id: ClientId,
    pub visit_id: Option<VisitId>,
    pub kind: OperationKind,
    pub amount: Decimal,
    pub currency: Option<CurrencyCode>,
    /// Defaults to the property's configured rate.
    pub commission_rate: Option<Percentage>,
    /// Defaults to the visit's advisor, then the listing advisor.
    #[serde(default)]
    pub advisor_ids: Vec<EmployeeId>,
    pub notes: Option<String>,
}

impl NewOperationInput {
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` for a non-positive amount.
    pub fn validate(mut self) -> Result<Self, DomainError> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::invalid("amount must be greater than zero"));
        }
        self.notes = optional_text("notes", self.notes.as_deref(), 4000)?;
        Ok(self)
    }
}

/// Request body for `PATCH /operations/{id}/payment`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
}

/// Query parameters for `GET /operations`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationFilter {
    pub kind: Option<OperationKind>,
    pub payment_status: Option<PaymentStatus>,
    pub property_id: Option<PropertyId>,
    pub client_id: Option<ClientId>,
    pub finalized: Option<bool>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl OperationFilter {
    #[must_use]
    pub const fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}
