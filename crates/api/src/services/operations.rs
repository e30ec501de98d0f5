//! Operation lifecycle and commission persistence.
//!
//! Commission rows are always written in the same transaction as the
//! operation change that produced them.

use sqlx::PgPool;

use estate_desk_core::commission::{self, CommissionSplit};
use estate_desk_core::{
    CurrencyCode, EmployeeId, OperationId, Percentage, PropertyStatus, UserId, VisitStatus,
};

use crate::db::{employees, operations, properties, visits};
use crate::error::AppError;
use crate::models::operation::{NewOperationInput, OperationDetail};

/// Operation service.
pub struct OperationService<'a> {
    pool: &'a PgPool,
    split: CommissionSplit,
    default_currency: CurrencyCode,
}

impl<'a> OperationService<'a> {
    /// `split` is snapshotted onto every new operation.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        split: CommissionSplit,
        default_currency: CurrencyCode,
    ) -> Self {
        Self {
            pool,
            split,
            default_currency,
        }
    }

    /// Register an operation and compute its commission shares.
    ///
    /// Without explicit advisors the visit's advisor is used, then the
    /// listing advisor.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the listing is closed or inactive,
    /// `AppError::Validation` for a kind that does not match the listing, an
    /// unusable visit, an inactive advisor or no advisor at all.
    pub async fn create(
        &self,
        input: &NewOperationInput,
        created_by: UserId,
    ) -> Result<OperationDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let property = properties::lock(&mut tx, input.property_id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        if property.status.is_closed() || property.status == PropertyStatus::Inactive {
            return Err(AppError::conflict(format!(
                "property is {} and cannot take a new operation",
                property.status
            )));
        }
        if !input.kind.matches_listing(property.listing_type) {
            return Err(AppError::validation(format!(
                "a {} operation does not match a {} listing",
                input.kind, property.listing_type
            )));
        }

        let visit_advisor = match input.visit_id {
            Some(visit_id) => {
                let visit = visits::get(&mut tx, visit_id)
                    .await?
                    .ok_or(AppError::NotFound("visit"))?;
                if visit.status != VisitStatus::Completed {
                    return Err(AppError::validation("the originating visit must be completed"));
                }
                if visit.property_id != input.property_id || visit.client_id != input.client_id {
                    return Err(AppError::validation(
                        "the originating visit is for a different property or client",
                    ));
                }
                Some(visit.advisor_id)
            }
            None => None,
        };

        let advisors: Vec<EmployeeId> = if input.advisor_ids.is_empty() {
            visit_advisor.or(property.advisor_id).into_iter().collect()
        } else {
            input.advisor_ids.clone()
        };
        for advisor in &advisors {
            if !employees::is_active_employee(&mut tx, *advisor).await? {
                return Err(AppError::validation(format!(
                    "employee {advisor} is not an active employee"
                )));
            }
        }

        let rate = match input.commission_rate {
            Some(rate) => rate,
            None => Percentage::new(property.commission_rate)
                .map_err(|e| AppError::Internal(format!("stored commission rate: {e}")))?,
        };
        let breakdown = commission::compute(input.amount, rate, self.split, &advisors)?;

        let operation = operations::insert(
            &mut tx,
            &operations::NewOperation {
                property_id: input.property_id,
                client_id: input.client_id,
                visit_id: input.visit_id,
                kind: input.kind,
                amount: input.amount,
                currency: input.currency.unwrap_or(self.default_currency),
                commission_rate: rate.value(),
                advisor_percent: self.split.advisor_percent().value(),
                commission_total: breakdown.total,
                notes: input.notes.as_deref(),
                created_by,
            },
        )
        .await?;
        let shares = operations::replace_shares(&mut tx, operation.id, &breakdown).await?;

        tx.commit().await?;

        tracing::info!(
            operation_id = %operation.id,
            property_id = %operation.property_id,
            kind = %operation.kind,
            commission_total = %breakdown.total,
            advisors = advisors.len(),
            "operation registered"
        );
        Ok(OperationDetail { operation, shares })
    }

    /// Recompute commission shares from the stored operation state.
    ///
    /// The stored amount, rate snapshot, split snapshot and advisors are
    /// used, so running this twice yields the same rows.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the operation is finalized.
    pub async fn recompute(&self, id: OperationId) -> Result<OperationDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let operation = operations::lock(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("operation"))?;
        if operation.is_finalized() {
            return Err(AppError::conflict("a finalized operation cannot be recomputed"));
        }

        let advisors = operations::share_advisors(&mut tx, id).await?;
        let rate = Percentage::new(operation.commission_rate)
            .map_err(|e| AppError::Internal(format!("stored commission rate: {e}")))?;
        let split = Percentage::new(operation.advisor_percent)
            .map(CommissionSplit::new)
            .map_err(|e| AppError::Internal(format!("stored advisor percent: {e}")))?;

        let breakdown = commission::compute(operation.amount, rate, split, &advisors)?;
        let shares = operations::replace_shares(&mut tx, id, &breakdown).await?;
        let operation = operations::lock(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("operation"))?;

        tx.commit().await?;

        tracing::info!(operation_id = %id, commission_total = %breakdown.total, "commission recomputed");
        Ok(OperationDetail { operation, shares })
    }

    /// Finalize an operation and close its listing as sold or rented.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the operation is already finalized or
    /// the listing cannot be closed.
    pub async fn finalize(&self, id: OperationId) -> Result<OperationDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let operation = operations::lock(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("operation"))?;
        if operation.is_finalized() {
            return Err(AppError::conflict("operation is already finalized"));
        }

        let property = properties::lock(&mut tx, operation.property_id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        let closed = property.status.close_with(operation.kind)?;
        properties::set_status(&mut tx, property.id, closed).await?;

        let operation = operations::mark_finalized(&mut tx, id).await?;
        let shares = operations::shares(&mut tx, id).await?;

        tx.commit().await?;

        tracing::info!(
            operation_id = %id,
            property_id = %property.id,
            status = %closed,
            "operation finalized"
        );
        Ok(OperationDetail { operation, shares })
    }
}
