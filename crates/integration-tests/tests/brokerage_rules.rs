//! Rotation and commission rules played out over a simulated week.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use estate_desk_core::authz::{Access, Action, authorize};
use estate_desk_core::commission::{self, CommissionSplit};
use estate_desk_core::rotation::{
    AdvisorCandidate, RotationError, TimeSlot, select_advisor, serves_zone,
};
use estate_desk_core::{EmployeeId, Percentage, Role, ShareRecipient};

struct Advisor {
    id: EmployeeId,
    zones: Vec<&'static str>,
    last_assigned_at: Option<DateTime<Utc>>,
    booked: Vec<TimeSlot>,
}

impl Advisor {
    fn new(id: i32, zones: &[&'static str]) -> Self {
        Self {
            id: EmployeeId::new(id),
            zones: zones.to_vec(),
            last_assigned_at: None,
            booked: Vec::new(),
        }
    }
}

/// Mirror of the scheduling transaction: filter, select, advance, book.
fn auto_assign(
    desk: &mut [Advisor],
    zone: &str,
    slot: TimeSlot,
    now: DateTime<Utc>,
) -> Result<EmployeeId, RotationError> {
    let candidates: Vec<AdvisorCandidate> = desk
        .iter()
        .filter(|a| serves_zone(&a.zones, zone))
        .filter(|a| !a.booked.iter().any(|b| b.overlaps(&slot)))
        .map(|a| AdvisorCandidate {
            employee_id: a.id,
            last_assigned_at: a.last_assigned_at,
        })
        .collect();

    let chosen = select_advisor(&candidates)?;
    let advisor = desk.iter_mut().find(|a| a.id == chosen).unwrap();
    advisor.last_assigned_at = Some(now);
    advisor.booked.push(slot);
    Ok(chosen)
}

fn monday(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn test_zone_rotation_over_a_morning() {
    let mut desk = vec![
        Advisor::new(3, &["Sopocachi", "Miraflores"]),
        Advisor::new(1, &["Sopocachi"]),
        Advisor::new(2, &["Calacoto"]),
        // Covers every zone.
        Advisor::new(4, &[]),
    ];

    let mut picks = Vec::new();
    for (i, hour) in (8..14).enumerate() {
        let slot = TimeSlot::new(monday(hour), 60);
        let now = monday(7) + Duration::minutes(i64::try_from(i).unwrap());
        picks.push(auto_assign(&mut desk, "sopocachi", slot, now).unwrap().as_i32());
    }

    // Advisor 2 never serves Sopocachi; the rest take turns by id on the
    // first lap, then by oldest pointer.
    assert_eq!(picks, vec![1, 3, 4, 1, 3, 4]);
}

#[test]
fn test_booked_advisor_is_skipped_without_losing_turn() {
    let mut desk = vec![Advisor::new(1, &[]), Advisor::new(2, &[])];
    desk[0].booked.push(TimeSlot::new(monday(10), 120));

    let clash = TimeSlot::new(monday(11), 60);
    assert_eq!(
        auto_assign(&mut desk, "Obrajes", clash, monday(7)).unwrap(),
        EmployeeId::new(2)
    );

    // Advisor 1 still has the oldest pointer once free again.
    let later = TimeSlot::new(monday(15), 60);
    assert_eq!(
        auto_assign(&mut desk, "Obrajes", later, monday(8)).unwrap(),
        EmployeeId::new(1)
    );
}

#[test]
fn test_back_to_back_visits_do_not_collide() {
    let mut desk = vec![Advisor::new(1, &[])];
    auto_assign(&mut desk, "Centro", TimeSlot::new(monday(9), 60), monday(7)).unwrap();

    let next = TimeSlot::new(monday(10), 60);
    assert!(auto_assign(&mut desk, "Centro", next, monday(8)).is_ok());

    let overlapping = TimeSlot::new(monday(10) + Duration::minutes(30), 30);
    assert_eq!(
        auto_assign(&mut desk, "Centro", overlapping, monday(8)),
        Err(RotationError::NoEligibleAdvisor)
    );
}

#[test]
fn test_no_advisor_for_zone() {
    let mut desk = vec![Advisor::new(1, &["Achumani"])];
    let slot = TimeSlot::new(monday(9), 60);

    assert_eq!(
        auto_assign(&mut desk, "El Alto", slot, monday(7)),
        Err(RotationError::NoEligibleAdvisor)
    );
}

#[test]
fn test_rotated_advisors_share_the_commission() {
    let mut desk = vec![Advisor::new(1, &[]), Advisor::new(2, &[])];
    let first = auto_assign(&mut desk, "Centro", TimeSlot::new(monday(9), 60), monday(7)).unwrap();
    let second =
        auto_assign(&mut desk, "Centro", TimeSlot::new(monday(9), 60), monday(7)).unwrap();
    assert_ne!(first, second);

    let rate = Percentage::new(dec("3")).unwrap();
    let breakdown =
        commission::compute(dec("100000.00"), rate, CommissionSplit::default(), &[first, second])
            .unwrap();

    assert_eq!(breakdown.total, dec("3000.00"));
    let advisor_amounts: Vec<Decimal> = breakdown
        .shares
        .iter()
        .filter(|s| s.recipient == ShareRecipient::Advisor)
        .map(|s| s.amount)
        .collect();
    assert_eq!(advisor_amounts, vec![dec("1050.00"), dec("1050.00")]);
    assert_eq!(breakdown.broker_amount(), dec("900.00"));
}

#[test]
fn test_three_way_split_leaves_residual_to_broker() {
    let advisors = [EmployeeId::new(1), EmployeeId::new(2), EmployeeId::new(3)];
    let rate = Percentage::new(dec("2.5")).unwrap();
    let breakdown =
        commission::compute(dec("48250.00"), rate, CommissionSplit::default(), &advisors)
            .unwrap();

    // 48250 * 2.5% = 1206.25; 70% = 844.375; / 3 = 281.458.. -> 281.46
    assert_eq!(breakdown.total, dec("1206.25"));
    for share in &breakdown.shares[..3] {
        assert_eq!(share.amount, dec("281.46"));
    }
    assert_eq!(breakdown.broker_amount(), dec("361.87"));

    let sum: Decimal = breakdown.shares.iter().map(|s| s.amount).sum();
    assert_eq!(sum, breakdown.total);
}

#[test]
fn test_only_office_staff_schedule_and_close() {
    for action in [Action::ScheduleVisits, Action::ManageOperations] {
        assert_eq!(authorize(Role::Broker, action), Access::Any);
        assert_eq!(authorize(Role::Secretary, action), Access::Any);
        assert_eq!(authorize(Role::Advisor, action), Access::Denied);
    }
    assert_eq!(authorize(Role::Advisor, Action::RecordVisitOutcome), Access::Own);
}
