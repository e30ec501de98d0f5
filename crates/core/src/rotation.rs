//! Round-robin advisor selection for visit assignment.
//!
//! The rotation pointer is a per-advisor `last_assigned_at` timestamp stored
//! with the employee. Selection here is pure: the caller loads and locks the
//! candidate rows, filters out busy advisors, calls [`select_advisor`], then
//! persists the new pointer for the winner in the same transaction.

use chrono::{DateTime, Duration, Utc};

use crate::EmployeeId;

/// Shortest bookable visit, in minutes.
pub const MIN_VISIT_MINUTES: i32 = 15;
/// Longest bookable visit, in minutes.
pub const MAX_VISIT_MINUTES: i32 = 480;
/// Duration used when a request does not give one.
pub const DEFAULT_VISIT_MINUTES: i32 = 60;
/// How far ahead a visit may be booked.
pub const BOOKING_HORIZON_DAYS: i64 = 730;

/// Errors from advisor selection.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RotationError {
    /// Nobody can take the visit; it must be assigned manually.
    #[error("no eligible advisor is available for this zone and time slot")]
    NoEligibleAdvisor,
}

/// An advisor that could take a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisorCandidate {
    pub employee_id: EmployeeId,
    /// `None` when the advisor has never been auto-assigned.
    pub last_assigned_at: Option<DateTime<Utc>>,
}

/// A booked time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub minutes: i32,
}

impl TimeSlot {
    /// Build a slot.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, minutes: i32) -> Self {
        Self { start, minutes }
    }

    /// Exclusive end of the slot, clamped to the latest representable instant.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.start
            .checked_add_signed(Duration::minutes(i64::from(self.minutes)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Half-open overlap: back-to-back slots do not collide.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Whether a visit duration is bookable.
#[must_use]
pub const fn is_valid_duration(minutes: i32) -> bool {
    minutes >= MIN_VISIT_MINUTES && minutes <= MAX_VISIT_MINUTES
}

/// Whether an advisor serving `zones` covers `zone`.
///
/// An empty zone list means the advisor covers every zone. Comparison
/// ignores case and surrounding whitespace.
#[must_use]
pub fn serves_zone<S: AsRef<str>>(zones: &[S], zone: &str) -> bool {
    if zones.is_empty() {
        return true;
    }
    let zone = zone.trim();
    zones
        .iter()
        .any(|z| z.as_ref().trim().eq_ignore_ascii_case(zone))
}

/// Pick the next advisor in rotation.
///
/// Candidates that were never assigned go first, then the oldest
/// `last_assigned_at`. Equal pointers fall back to the lowest employee id,
/// so the result does not depend on input order.
///
/// # Errors
///
/// Returns [`RotationError::NoEligibleAdvisor`] when `candidates` is empty.
pub fn select_advisor(candidates: &[AdvisorCandidate]) -> Result<EmployeeId, RotationError> {
    candidates
        .iter()
        // Option orders None before Some, which puts never-assigned first.
        .min_by_key(|c| (c.last_assigned_at, c.employee_id))
        .map(|c| c.employee_id)
        .ok_or(RotationError::NoEligibleAdvisor)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 9, 0, 0).unwrap()
    }

    fn candidate(id: i32, last: Option<DateTime<Utc>>) -> AdvisorCandidate {
        AdvisorCandidate {
            employee_id: EmployeeId::new(id),
            last_assigned_at: last,
        }
    }

    #[test]
    fn test_oldest_pointer_wins_then_rotates() {
        let mut pool = vec![candidate(1, Some(day(1))), candidate(2, Some(day(3)))];

        let first = select_advisor(&pool).unwrap();
        assert_eq!(first, EmployeeId::new(1));
        pool[0].last_assigned_at = Some(day(10));

        let second = select_advisor(&pool).unwrap();
        assert_eq!(second, EmployeeId::new(2));
    }

    #[test]
    fn test_never_assigned_goes_first() {
        let pool = [candidate(5, Some(day(1))), candidate(9, None)];
        assert_eq!(select_advisor(&pool).unwrap(), EmployeeId::new(9));
    }

    #[test]
    fn test_ties_break_by_lowest_id() {
        let pool = [candidate(7, None), candidate(3, None), candidate(4, None)];
        assert_eq!(select_advisor(&pool).unwrap(), EmployeeId::new(3));

        let pool = [candidate(8, Some(day(2))), candidate(6, Some(day(2)))];
        assert_eq!(select_advisor(&pool).unwrap(), EmployeeId::new(6));
    }

    #[test]
    fn test_empty_pool_is_no_eligible_advisor() {
        assert_eq!(select_advisor(&[]), Err(RotationError::NoEligibleAdvisor));
    }

    #[test]
    fn test_each_advisor_once_before_repeat() {
        let n = 5;
        let mut pool: Vec<_> = (1..=n).map(|id| candidate(id, None)).collect();
        let mut seen = Vec::new();

        for step in 0..n {
            let chosen = select_advisor(&pool).unwrap();
            seen.push(chosen);
            let slot = pool.iter_mut().find(|c| c.employee_id == chosen).unwrap();
            slot.last_assigned_at = Some(day(1) + Duration::minutes(i64::from(step)));
        }

        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);

        // The sixth request starts the next lap with the first winner.
        assert_eq!(select_advisor(&pool).unwrap(), EmployeeId::new(1));
    }

    #[test]
    fn test_serves_zone() {
        let zones = ["Equipetrol", "Norte"];
        assert!(serves_zone(&zones, "equipetrol"));
        assert!(serves_zone(&zones, " NORTE "));
        assert!(!serves_zone(&zones, "Sur"));
        assert!(serves_zone::<&str>(&[], "Sur"));
    }

    #[test]
    fn test_slot_overlap() {
        let a = TimeSlot::new(day(1), 60);
        let back_to_back = TimeSlot::new(day(1) + Duration::minutes(60), 30);
        let inside = TimeSlot::new(day(1) + Duration::minutes(30), 15);
        assert!(!a.overlaps(&back_to_back));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn test_slot_end_at_calendar_limit_saturates() {
        let start = DateTime::<Utc>::MAX_UTC - Duration::minutes(30);
        let slot = TimeSlot::new(start, 60);
        assert_eq!(slot.end(), DateTime::<Utc>::MAX_UTC);
        assert!(slot.overlaps(&TimeSlot::new(start, 15)));
    }

    #[test]
    fn test_duration_bounds() {
        assert!(is_valid_duration(DEFAULT_VISIT_MINUTES));
        assert!(is_valid_duration(15));
        assert!(is_valid_duration(480));
        assert!(!is_valid_duration(14));
        assert!(!is_valid_duration(481));
    }
}
