//! Visit scheduling types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use estate_desk_core::rotation::{
    BOOKING_HORIZON_DAYS, DEFAULT_VISIT_MINUTES, TimeSlot, is_valid_duration,
};
use estate_desk_core::{
    ClientId, DomainError, EmployeeId, PropertyId, UserId, VisitId, VisitStatus,
};

use super::{PageParams, optional_text};

/// A scheduled property visit (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Visit {
    pub id: VisitId,
    pub property_id: PropertyId,
    pub client_id: ClientId,
    pub advisor_id: EmployeeId,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: VisitStatus,
    pub notes: Option<String>,
    pub outcome_notes: Option<String>,
    pub client_interested: Option<bool>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Visit {
    #[must_use]
    pub const fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.scheduled_at, self.duration_minutes)
    }
}

fn validate_slot(
    scheduled_at: DateTime<Utc>,
    duration_minutes: Option<i32>,
    now: DateTime<Utc>,
) -> Result<TimeSlot, DomainError> {
    let minutes = duration_minutes.unwrap_or(DEFAULT_VISIT_MINUTES);
    if !is_valid_duration(minutes) {
        return Err(DomainError::invalid(
            "duration_minutes must be between 15 and 480",
        ));
    }
    if scheduled_at <= now {
        return Err(DomainError::invalid("scheduled_at must be in the future"));
    }
    if scheduled_at.signed_duration_since(now) > Duration::days(BOOKING_HORIZON_DAYS) {
        return Err(DomainError::invalid(
            "scheduled_at must be within two years from now",
        ));
    }
    Ok(TimeSlot::new(scheduled_at, minutes))
}

/// Request body for `POST /visits`.
///
/// Without `advisor_id` the visit is assigned by rotation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVisitInput {
    pub property_id: PropertyId,
    pub client_id: ClientId,
    pub advisor_id: Option<EmployeeId>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

impl NewVisitInput {
    /// Validate and return the requested slot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` for a past or too distant start, or an
    /// out-of-range duration.
    pub fn validate(mut self, now: DateTime<Utc>) -> Result<(Self, TimeSlot), DomainError> {
        let slot = validate_slot(self.scheduled_at, self.duration_minutes, now)?;
        self.notes = optional_text("notes", self.notes.as_deref(), 2000)?;
        Ok((self, slot))
    }
}

/// Request body for `POST /visits/{id}/outcome`.
#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeInput {
    pub outcome_notes: Option<String>,
    pub client_interested: bool,
}

impl OutcomeInput {
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` if the notes are too long.
    pub fn validate(mut self) -> Result<Self, DomainError> {
        self.outcome_notes = optional_text("outcome_notes", self.outcome_notes.as_deref(), 4000)?;
        Ok(self)
    }
}

/// Request body for `POST /visits/{id}/reschedule`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RescheduleInput {
    pub scheduled_at: DateTime<Utc>,
    /// Keeps the current duration when absent.
    pub duration_minutes: Option<i32>,
}

impl RescheduleInput {
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` for a past start or out-of-range
    /// duration.
    pub fn slot(&self, current_minutes: i32, now: DateTime<Utc>) -> Result<TimeSlot, DomainError> {
        validate_slot(
            self.scheduled_at,
            Some(self.duration_minutes.unwrap_or(current_minutes)),
            now,
        )
    }
}

/// Request body for `POST /visits/{id}/cancel`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelInput {
    pub reason: Option<String>,
}

impl CancelInput {
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` if the reason is too long.
    pub fn validate(mut self) -> Result<Self, DomainError> {
        self.reason = optional_text("reason", self.reason.as_deref(), 500)?;
        Ok(self)
    }
}

/// Request body for `POST /visits/{id}/assign`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AssignInput {
    pub advisor_id: EmployeeId,
}

/// Query parameters for `GET /visits`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitFilter {
    pub status: Option<VisitStatus>,
    pub advisor_id: Option<EmployeeId>,
    pub property_id: Option<PropertyId>,
    pub client_id: Option<ClientId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl VisitFilter {
    #[must_use]
    pub const fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn input(offset_minutes: i64, duration: Option<i32>) -> NewVisitInput {
        NewVisitInput {
            property_id: PropertyId::new(1),
            client_id: ClientId::new(2),
            advisor_id: None,
            scheduled_at: now() + Duration::minutes(offset_minutes),
            duration_minutes: duration,
            notes: Some("  ".into()),
        }
    }

    #[test]
    fn test_default_duration_is_sixty_minutes() {
        let (valid, slot) = input(60, None).validate(now()).unwrap();
        assert_eq!(slot.minutes, 60);
        assert_eq!(valid.notes, None);
    }

    #[test]
    fn test_rejects_past_and_bad_duration() {
        assert!(input(-5, None).validate(now()).is_err());
        assert!(input(60, Some(10)).validate(now()).is_err());
        assert!(input(60, Some(481)).validate(now()).is_err());
    }

    #[test]
    fn test_rejects_start_beyond_booking_horizon() {
        let limit = i64::from(24 * 60) * BOOKING_HORIZON_DAYS;
        assert!(input(limit, None).validate(now()).is_ok());
        assert!(input(limit + 1, None).validate(now()).is_err());

        let mut far = input(60, None);
        far.scheduled_at = "+262142-12-31T23:30:00Z".parse().unwrap();
        assert!(far.validate(now()).is_err());

        let reschedule = RescheduleInput {
            scheduled_at: DateTime::<Utc>::MAX_UTC,
            duration_minutes: Some(60),
        };
        assert!(reschedule.slot(60, now()).is_err());
    }

    #[test]
    fn test_reschedule_keeps_duration() {
        let reschedule = RescheduleInput {
            scheduled_at: now() + Duration::days(1),
            duration_minutes: None,
        };
        assert_eq!(reschedule.slot(90, now()).unwrap().minutes, 90);
    }
}
