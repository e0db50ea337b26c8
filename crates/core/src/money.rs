//! Money helpers.
//!
//! Prices and totals are `Decimal` amounts in the marketplace currency.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Round an amount to whole cents, midpoint away from zero (0.005 → 0.01).
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `unit_price * quantity` without rounding.
///
/// Fails with `Validation` when the product does not fit in a `Decimal`.
pub fn line_total(unit_price: Decimal, quantity: i64) -> DomainResult<Decimal> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| DomainError::validation("amount too large"))
}

/// Sum of `amounts`; `Validation` on overflow.
pub fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> DomainResult<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| DomainError::validation("amount too large"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to_cents(dec!(10.005)), dec!(10.01));
        assert_eq!(round_to_cents(dec!(10.004)), dec!(10.00));
        assert_eq!(round_to_cents(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn line_total_multiplies() {
        assert_eq!(line_total(dec!(3.33), 3), Ok(dec!(9.99)));
        assert_eq!(line_total(dec!(10), 0), Ok(Decimal::ZERO));
    }

    #[test]
    fn oversized_line_total_is_an_error() {
        let err = line_total(dec!(9999999999.9999), i64::MAX).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(checked_sum([dec!(1.5), dec!(2.25)]), Ok(dec!(3.75)));
        assert_eq!(checked_sum(Vec::new()), Ok(Decimal::ZERO));
        assert!(matches!(
            checked_sum([Decimal::MAX, dec!(1)]),
            Err(DomainError::Validation(_))
        ));
    }
}
