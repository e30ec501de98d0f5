//! Visit scheduling, including rotation assignment.
//!
//! Every write runs in one transaction. Automatic assignment locks the
//! candidate employee rows (`FOR UPDATE`), so two requests racing for the
//! same zone see each other's pointer update and never pick the same
//! advisor for the same turn. Explicit bookings, reschedules and
//! reassignments lock the target advisor's row before reading the calendar.

use sqlx::PgPool;

use estate_desk_core::rotation::{self, TimeSlot};
use estate_desk_core::{EmployeeId, PropertyStatus, UserId, VisitId, VisitStatus};

use crate::db::{clients, employees, properties, visits};
use crate::error::AppError;
use crate::models::visit::{NewVisitInput, OutcomeInput, Visit};

/// Visit scheduling service.
pub struct VisitService<'a> {
    pool: &'a PgPool,
}

impl<'a> VisitService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Schedule a visit, assigning an advisor by rotation when none is given.
    ///
    /// An explicit advisor does not move the rotation pointer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for a missing property or client,
    /// `AppError::Conflict` if the listing is closed or the advisor is
    /// booked, `AppError::Validation` for an advisor that is not an active
    /// advisor, and `AppError::NoEligibleAdvisor` if rotation finds nobody.
    pub async fn schedule(
        &self,
        input: &NewVisitInput,
        slot: TimeSlot,
        created_by: UserId,
    ) -> Result<Visit, AppError> {
        let mut tx = self.pool.begin().await?;

        let property = properties::lock(&mut tx, input.property_id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        if property.status.is_closed() || property.status == PropertyStatus::Inactive {
            return Err(AppError::conflict(format!(
                "property is {} and cannot be visited",
                property.status
            )));
        }

        if !clients::is_active(&mut tx, input.client_id).await? {
            return Err(AppError::NotFound("client"));
        }

        let (advisor, by_rotation) = match input.advisor_id {
            Some(advisor) => {
                ensure_available(&mut tx, advisor, slot, None).await?;
                (advisor, false)
            }
            None => {
                let candidates = employees::lock_rotation_candidates(&mut tx, &property.zone).await?;
                let ids: Vec<EmployeeId> = candidates.iter().map(|c| c.employee_id).collect();
                let busy = visits::busy_advisors(&mut tx, &ids, slot, None).await?;
                let free: Vec<_> = candidates
                    .into_iter()
                    .filter(|c| !busy.contains(&c.employee_id))
                    .collect();

                let advisor = rotation::select_advisor(&free)?;
                employees::advance_rotation(&mut tx, advisor).await?;
                (advisor, true)
            }
        };

        let visit = visits::insert(
            &mut tx,
            &visits::NewVisit {
                property_id: input.property_id,
                client_id: input.client_id,
                advisor_id: advisor,
                slot,
                notes: input.notes.as_deref(),
                created_by,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            visit_id = %visit.id,
            advisor_id = %advisor,
            by_rotation,
            zone = %property.zone,
            "visit scheduled"
        );
        Ok(visit)
    }

    /// Move a visit to a new slot.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the visit is closed or the advisor is
    /// booked in the new slot.
    pub async fn reschedule(&self, id: VisitId, slot: TimeSlot) -> Result<Visit, AppError> {
        let mut tx = self.pool.begin().await?;

        let visit = visits::lock(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("visit"))?;
        visit.status.transition_to(VisitStatus::Rescheduled)?;

        employees::lock_for_booking(&mut tx, visit.advisor_id).await?;
        let busy = visits::busy_advisors(&mut tx, &[visit.advisor_id], slot, Some(id)).await?;
        if !busy.is_empty() {
            return Err(AppError::conflict("advisor is already booked in that slot"));
        }

        let visit = visits::reschedule(&mut tx, id, slot).await?;
        tx.commit().await?;

        tracing::info!(visit_id = %id, scheduled_at = %slot.start, "visit rescheduled");
        Ok(visit)
    }

    /// Cancel a visit.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the visit is already closed.
    pub async fn cancel(&self, id: VisitId, reason: Option<&str>) -> Result<Visit, AppError> {
        let mut tx = self.pool.begin().await?;

        let visit = visits::lock(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("visit"))?;
        visit.status.transition_to(VisitStatus::Cancelled)?;

        let visit = visits::cancel(&mut tx, id, reason).await?;
        tx.commit().await?;

        tracing::info!(visit_id = %id, "visit cancelled");
        Ok(visit)
    }

    /// Record how a visit went and close it.
    ///
    /// With an own-only `scope`, only that advisor's visits are accepted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for a visit outside `scope`, and
    /// `AppError::Conflict` if the visit is already closed.
    pub async fn record_outcome(
        &self,
        id: VisitId,
        input: &OutcomeInput,
        scope: Option<EmployeeId>,
    ) -> Result<Visit, AppError> {
        let mut tx = self.pool.begin().await?;

        let visit = visits::lock(&mut tx, id).await?;
        let visit = match (visit, scope) {
            (Some(v), Some(own)) if v.advisor_id != own => return Err(AppError::Forbidden),
            (Some(v), _) => v,
            (None, Some(_)) => return Err(AppError::Forbidden),
            (None, None) => return Err(AppError::NotFound("visit")),
        };
        visit.status.transition_to(VisitStatus::Completed)?;

        let visit = visits::complete(
            &mut tx,
            id,
            input.outcome_notes.as_deref(),
            input.client_interested,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            visit_id = %id,
            client_interested = input.client_interested,
            "visit outcome recorded"
        );
        Ok(visit)
    }

    /// Hand an open visit to another advisor. The rotation pointer is not
    /// moved.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the visit is closed or the advisor is
    /// booked, and `AppError::Validation` if the advisor is not an active
    /// advisor.
    pub async fn reassign(&self, id: VisitId, advisor: EmployeeId) -> Result<Visit, AppError> {
        let mut tx = self.pool.begin().await?;

        let visit = visits::lock(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("visit"))?;
        if visit.status.is_terminal() {
            return Err(AppError::conflict(format!(
                "visit is {} and cannot be reassigned",
                visit.status
            )));
        }
        if visit.advisor_id == advisor {
            return Ok(visit);
        }

        ensure_available(&mut tx, advisor, visit.slot(), Some(id)).await?;

        let visit = visits::reassign(&mut tx, id, advisor).await?;
        tx.commit().await?;

        tracing::info!(visit_id = %id, advisor_id = %advisor, "visit reassigned");
        Ok(visit)
    }
}

/// Lock `advisor` and check it is an active advisor with nothing booked in
/// `slot`. The lock is held until the caller's transaction ends.
async fn ensure_available(
    conn: &mut sqlx::PgConnection,
    advisor: EmployeeId,
    slot: TimeSlot,
    excluding: Option<VisitId>,
) -> Result<(), AppError> {
    if !employees::lock_for_booking(conn, advisor).await? {
        return Err(AppError::validation(format!(
            "employee {advisor} is not an active advisor"
        )));
    }
    let busy = visits::busy_advisors(conn, &[advisor], slot, excluding).await?;
    if !busy.is_empty() {
        return Err(AppError::conflict("advisor is already booked in that slot"));
    }
    Ok(())
}
