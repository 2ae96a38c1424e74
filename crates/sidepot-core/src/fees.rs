//! # Fee Calculator
//!
//! Pure, stateless wager arithmetic. Maps a wager amount to the pot, fee,
//! payout, and refund figures used by escrow settlement.
//!
//! ## Model
//!
//! Both parties deposit the wager, so `total_pot = 2 × wager`. The platform
//! fee is a fraction of the pot (`DEFAULT_FEE_RATE` = 2.5%), and the
//! decisive winner receives the remainder. On a tie each party receives
//! half the post-fee pot back.
//!
//! ## Precision Invariant
//!
//! All computation stays in [`Decimal`] at full precision; nothing rounds
//! between chained computations. `fee + winner_payout == total_pot` holds
//! exactly, as does `2 × tie_refund + fee == total_pot`. Rounding is a
//! display concern only.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Platform fee rate applied to the doubled pot (2.5%).
pub const DEFAULT_FEE_RATE: Decimal = dec!(0.025);

/// Derived money figures for an escrow hold.
///
/// Always produced by [`breakdown`] / [`breakdown_with_rate`] — the fields
/// are mutually consistent by construction and are never edited
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Deposit owed by the challenging party (= wager).
    pub challenger_deposit: Decimal,
    /// Deposit owed by the challenged party (= wager).
    pub challengee_deposit: Decimal,
    /// Combined pot before fees (= 2 × wager).
    pub total_pot: Decimal,
    /// Platform fee (= total_pot × fee_rate).
    pub fee: Decimal,
    /// Amount paid to a decisive winner (= total_pot − fee).
    pub winner_payout: Decimal,
}

impl FeeBreakdown {
    /// Whether the derived fields are mutually consistent.
    ///
    /// A breakdown failing this check is an integrity violation, never a
    /// recoverable condition.
    pub fn is_consistent(&self) -> bool {
        self.total_pot == self.challenger_deposit + self.challengee_deposit
            && self.fee + self.winner_payout == self.total_pot
    }
}

/// The computed difference between an original and a proposed wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerDiff {
    /// Proposed minus original.
    pub delta: Decimal,
    /// Percentage change relative to the original wager.
    /// `None` when the original wager is zero.
    pub percent_change: Option<Decimal>,
    /// Additional deposit each party must commit (= delta).
    pub per_party_deposit_adjustment: Decimal,
}

/// Compute the pot/fee/payout breakdown for a wager at the default fee rate.
///
/// The caller must pass a non-negative wager; this function has no error
/// conditions of its own.
pub fn breakdown(wager: Decimal) -> FeeBreakdown {
    breakdown_with_rate(wager, DEFAULT_FEE_RATE)
}

/// Compute the pot/fee/payout breakdown for a wager at an explicit fee rate.
pub fn breakdown_with_rate(wager: Decimal, fee_rate: Decimal) -> FeeBreakdown {
    let total_pot = wager * dec!(2);
    let fee = total_pot * fee_rate;
    FeeBreakdown {
        challenger_deposit: wager,
        challengee_deposit: wager,
        total_pot,
        fee,
        winner_payout: total_pot - fee,
    }
}

/// The per-party refund when a dispute resolves as a tie.
///
/// Each original depositor receives half the post-fee pot.
pub fn tie_refund(breakdown: &FeeBreakdown) -> Decimal {
    breakdown.winner_payout / dec!(2)
}

/// Compute the money-flow difference between an original and a proposed wager.
pub fn diff(original: Decimal, proposed: Decimal) -> WagerDiff {
    let delta = proposed - original;
    let percent_change = if original.is_zero() {
        None
    } else {
        Some(delta / original * dec!(100))
    };
    WagerDiff {
        delta,
        percent_change,
        per_party_deposit_adjustment: delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn breakdown_of_ten() {
        let b = breakdown(dec!(10));
        assert_eq!(b.challenger_deposit, dec!(10));
        assert_eq!(b.challengee_deposit, dec!(10));
        assert_eq!(b.total_pot, dec!(20));
        assert_eq!(b.fee, dec!(0.5));
        assert_eq!(b.winner_payout, dec!(19.5));
        assert!(b.is_consistent());
    }

    #[test]
    fn breakdown_of_one_token() {
        // wager 1 → pot 2, fee 0.05, payout 1.95, tie refund 0.975
        let b = breakdown(dec!(1));
        assert_eq!(b.total_pot, dec!(2));
        assert_eq!(b.fee, dec!(0.05));
        assert_eq!(b.winner_payout, dec!(1.95));
        assert_eq!(tie_refund(&b), dec!(0.975));
    }

    #[test]
    fn breakdown_of_five() {
        // wager 5 → pot 10, fee 0.25, payout 9.75
        let b = breakdown(dec!(5));
        assert_eq!(b.total_pot, dec!(10));
        assert_eq!(b.fee, dec!(0.25));
        assert_eq!(b.winner_payout, dec!(9.75));
    }

    #[test]
    fn breakdown_of_zero() {
        let b = breakdown(Decimal::ZERO);
        assert_eq!(b.total_pot, Decimal::ZERO);
        assert_eq!(b.fee, Decimal::ZERO);
        assert_eq!(b.winner_payout, Decimal::ZERO);
        assert!(b.is_consistent());
    }

    #[test]
    fn tie_refund_identity() {
        let b = breakdown(dec!(1));
        let refund = tie_refund(&b);
        assert_eq!(refund * dec!(2) + b.fee, b.total_pot);
    }

    #[test]
    fn custom_fee_rate() {
        let b = breakdown_with_rate(dec!(100), dec!(0.1));
        assert_eq!(b.total_pot, dec!(200));
        assert_eq!(b.fee, dec!(20));
        assert_eq!(b.winner_payout, dec!(180));
    }

    #[test]
    fn diff_increase() {
        let d = diff(dec!(10), dec!(15));
        assert_eq!(d.delta, dec!(5));
        assert_eq!(d.percent_change, Some(dec!(50)));
        assert_eq!(d.per_party_deposit_adjustment, dec!(5));
    }

    #[test]
    fn diff_decrease() {
        let d = diff(dec!(20), dec!(15));
        assert_eq!(d.delta, dec!(-5));
        assert_eq!(d.percent_change, Some(dec!(-25)));
    }

    #[test]
    fn diff_from_zero_has_no_percent() {
        let d = diff(Decimal::ZERO, dec!(15));
        assert_eq!(d.delta, dec!(15));
        assert_eq!(d.percent_change, None);
    }

    #[test]
    fn inconsistent_breakdown_detected() {
        let mut b = breakdown(dec!(10));
        b.fee += dec!(0.01);
        assert!(!b.is_consistent());
    }

    proptest! {
        /// fee + payout reconstitutes the pot exactly for any wager.
        #[test]
        fn fee_plus_payout_is_pot(mantissa in 0i64..1_000_000_000, scale in 0u32..=4) {
            let wager = Decimal::new(mantissa, scale);
            let b = breakdown(wager);
            prop_assert_eq!(b.fee + b.winner_payout, b.total_pot);
            prop_assert_eq!(b.total_pot, wager * dec!(2));
            prop_assert!(b.is_consistent());
        }

        /// Two tie refunds plus the fee reconstitute the pot exactly.
        #[test]
        fn tie_refunds_plus_fee_is_pot(mantissa in 0i64..1_000_000_000, scale in 0u32..=4) {
            let wager = Decimal::new(mantissa, scale);
            let b = breakdown(wager);
            let refund = tie_refund(&b);
            prop_assert_eq!(refund * dec!(2) + b.fee, b.total_pot);
        }

        /// The diff delta always equals the per-party deposit adjustment.
        #[test]
        fn diff_delta_matches_adjustment(a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let d = diff(Decimal::from(a), Decimal::from(b));
            prop_assert_eq!(d.delta, d.per_party_deposit_adjustment);
            prop_assert_eq!(d.delta, Decimal::from(b) - Decimal::from(a));
        }
    }
}
