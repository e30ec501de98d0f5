//! Commission totals and per-participant splits.
//!
//! The total is `amount × rate / 100` rounded half away from zero to the
//! currency's minor unit. The advisor pool is divided equally among the
//! operation's advisors, each share rounded half away from zero to the
//! minor unit, and the broker share is whatever remains. The broker
//! therefore absorbs every residual cent and the shares always add up to the
//! total exactly. When rounding up would push the advisors past the total
//! (a full advisor pool), the excess cents come back from the last advisors,
//! one cent each, so no share is ever negative.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::money::{MINOR_UNIT_SCALE, round_minor};
use crate::{EmployeeId, Percentage, ShareRecipient};

/// Scale used when storing per-advisor percentages such as 70 / 3.
pub const PERCENT_SCALE: u32 = 4;

/// Errors from commission computation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommissionError {
    #[error("operation amount must be greater than zero")]
    NonPositiveAmount,
    #[error("an operation needs at least one advisor")]
    NoAdvisors,
    #[error("advisor {0} appears more than once")]
    DuplicateAdvisor(EmployeeId),
    #[error("advisor and broker percentages must add up to 100")]
    SplitMismatch,
}

/// How the total commission is divided between advisors and the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    advisor_percent: Percentage,
}

impl CommissionSplit {
    /// Split with the given advisor pool; the broker gets the rest.
    #[must_use]
    pub const fn new(advisor_percent: Percentage) -> Self {
        Self { advisor_percent }
    }

    /// Split from an explicit advisor/broker pair.
    ///
    /// # Errors
    ///
    /// Returns [`CommissionError::SplitMismatch`] if the two do not sum to 100.
    pub fn from_parts(
        advisor_percent: Percentage,
        broker_percent: Percentage,
    ) -> Result<Self, CommissionError> {
        if advisor_percent.value() + broker_percent.value() != Decimal::ONE_HUNDRED {
            return Err(CommissionError::SplitMismatch);
        }
        Ok(Self { advisor_percent })
    }

    #[must_use]
    pub const fn advisor_percent(&self) -> Percentage {
        self.advisor_percent
    }

    #[must_use]
    pub fn broker_percent(&self) -> Decimal {
        Decimal::ONE_HUNDRED - self.advisor_percent.value()
    }
}

impl Default for CommissionSplit {
    /// 70% advisors, 30% broker.
    fn default() -> Self {
        Self {
            advisor_percent: Percentage::new(Decimal::from(70)).unwrap_or(Percentage::FULL),
        }
    }
}

/// One participant's part of the commission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub recipient: ShareRecipient,
    /// Set for advisor shares only.
    pub employee_id: Option<EmployeeId>,
    /// Percentage of the total this share represents.
    pub percent: Decimal,
    pub amount: Decimal,
}

/// Result of [`compute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub total: Decimal,
    /// Advisor shares in input order, followed by the broker share.
    pub shares: Vec<Share>,
}

impl Breakdown {
    /// The broker's share amount.
    #[must_use]
    pub fn broker_amount(&self) -> Decimal {
        self.shares
            .iter()
            .filter(|s| s.recipient == ShareRecipient::Broker)
            .map(|s| s.amount)
            .sum()
    }
}

/// Compute the commission for an operation.
///
/// The result depends only on the arguments, so recomputing from a stored
/// operation (amount, rate snapshot, split snapshot, advisors) reproduces
/// the same rows.
///
/// # Errors
///
/// Returns an error if `amount` is not positive, `advisors` is empty, or an
/// advisor is listed twice.
pub fn compute(
    amount: Decimal,
    rate: Percentage,
    split: CommissionSplit,
    advisors: &[EmployeeId],
) -> Result<Breakdown, CommissionError> {
    if amount <= Decimal::ZERO {
        return Err(CommissionError::NonPositiveAmount);
    }
    if advisors.is_empty() {
        return Err(CommissionError::NoAdvisors);
    }
    for (i, id) in advisors.iter().enumerate() {
        if advisors.iter().skip(i + 1).any(|other| other == id) {
            return Err(CommissionError::DuplicateAdvisor(*id));
        }
    }

    let total = round_minor(rate.of(amount));
    let count = Decimal::from(advisors.len());
    let pool_percent = split.advisor_percent().value();
    let per_advisor = round_minor(split.advisor_percent().of(total) / count);
    let per_advisor_percent = (pool_percent / count).round_dp(PERCENT_SCALE);

    let mut shares: Vec<Share> = advisors
        .iter()
        .map(|id| Share {
            recipient: ShareRecipient::Advisor,
            employee_id: Some(*id),
            percent: per_advisor_percent,
            amount: per_advisor,
        })
        .collect();

    let cent = Decimal::new(1, MINOR_UNIT_SCALE);
    let mut excess = shares.iter().map(|s| s.amount).sum::<Decimal>() - total;
    for share in shares.iter_mut().rev() {
        if excess <= Decimal::ZERO {
            break;
        }
        if share.amount >= cent {
            share.amount -= cent;
            excess -= cent;
        }
    }

    let advisors_total: Decimal = shares.iter().map(|s| s.amount).sum();
    shares.push(Share {
        recipient: ShareRecipient::Broker,
        employee_id: None,
        percent: split.broker_percent(),
        amount: total - advisors_total,
    });

    Ok(Breakdown { total, shares })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn pct(s: &str) -> Percentage {
        Percentage::new(dec(s)).unwrap()
    }

    fn ids(n: i32) -> Vec<EmployeeId> {
        (1..=n).map(EmployeeId::new).collect()
    }

    #[test]
    fn test_sale_of_100k_at_3_percent() {
        let b = compute(dec("100000"), pct("3"), CommissionSplit::default(), &ids(1)).unwrap();
        assert_eq!(b.total, dec("3000.00"));
        assert_eq!(b.shares.len(), 2);
        assert_eq!(b.shares[0].amount, dec("2100.00"));
        assert_eq!(b.shares[0].employee_id, Some(EmployeeId::new(1)));
        assert_eq!(b.shares[1].recipient, ShareRecipient::Broker);
        assert_eq!(b.shares[1].amount, dec("900.00"));
        assert_eq!(b.broker_amount(), dec("900.00"));
    }

    #[test]
    fn test_broker_absorbs_residual_cents() {
        let b = compute(dec("1000"), pct("1"), CommissionSplit::default(), &ids(3)).unwrap();
        assert_eq!(b.total, dec("10.00"));
        for advisor in &b.shares[..3] {
            assert_eq!(advisor.amount, dec("2.33"));
            assert_eq!(advisor.percent, dec("23.3333"));
        }
        assert_eq!(b.broker_amount(), dec("3.01"));
    }

    #[test]
    fn test_advisor_share_rounds_half_up() {
        // 1001 * 1% = 10.01; 70% = 7.007
        let b = compute(dec("1001"), pct("1"), CommissionSplit::default(), &ids(1)).unwrap();
        assert_eq!(b.total, dec("10.01"));
        assert_eq!(b.shares[0].amount, dec("7.01"));
        assert_eq!(b.broker_amount(), dec("3.00"));
    }

    #[test]
    fn test_full_pool_gives_back_rounded_up_cents() {
        // 2 * 1% = 0.02 split three ways at 0.0067 each
        let split = CommissionSplit::new(Percentage::FULL);
        let b = compute(dec("2"), pct("1"), split, &ids(3)).unwrap();
        let amounts: Vec<Decimal> = b.shares.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![dec("0.01"), dec("0.01"), dec("0"), dec("0")]);
        assert_eq!(b.broker_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_total_rounds_half_away_from_zero() {
        // 1234.50 * 1% = 12.345
        let b = compute(dec("1234.50"), pct("1"), CommissionSplit::default(), &ids(1)).unwrap();
        assert_eq!(b.total, dec("12.35"));
    }

    #[test]
    fn test_shares_sum_to_total_over_sweep() {
        let amounts = ["0.01", "1", "99.99", "1234.57", "100000", "987654.33"];
        let rates = ["0", "0.5", "1", "2.75", "3", "6", "33.33", "100"];
        let splits = ["0", "50", "70", "66.67", "100"];

        for amount in amounts {
            for rate in rates {
                for split in splits {
                    for n in 1..=7 {
                        let b = compute(
                            dec(amount),
                            pct(rate),
                            CommissionSplit::new(pct(split)),
                            &ids(n),
                        )
                        .unwrap();
                        let sum: Decimal = b.shares.iter().map(|s| s.amount).sum();
                        assert_eq!(sum, b.total, "{amount} @ {rate}% split {split} n={n}");
                        assert!(b.shares.iter().all(|s| s.amount >= Decimal::ZERO));
                    }
                }
            }
        }
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let args = (dec("45500"), pct("4"), CommissionSplit::new(pct("60")));
        let a = compute(args.0, args.1, args.2, &ids(2)).unwrap();
        let b = compute(args.0, args.1, args.2, &ids(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation() {
        let split = CommissionSplit::default();
        assert_eq!(
            compute(Decimal::ZERO, pct("3"), split, &ids(1)),
            Err(CommissionError::NonPositiveAmount)
        );
        assert_eq!(
            compute(dec("10"), pct("3"), split, &[]),
            Err(CommissionError::NoAdvisors)
        );
        let dup = [EmployeeId::new(4), EmployeeId::new(4)];
        assert_eq!(
            compute(dec("10"), pct("3"), split, &dup),
            Err(CommissionError::DuplicateAdvisor(EmployeeId::new(4)))
        );
    }

    #[test]
    fn test_split_from_parts() {
        assert!(CommissionSplit::from_parts(pct("70"), pct("30")).is_ok());
        assert_eq!(
            CommissionSplit::from_parts(pct("70"), pct("20")),
            Err(CommissionError::SplitMismatch)
        );
        assert_eq!(CommissionSplit::default().broker_percent(), dec("30"));
    }
}
