//! Money rounding and store-rate conversion

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{FormattableCurrency, iso::Currency};

/// Round a monetary amount to the minor unit of `currency`.
///
/// Midpoints round away from zero, so `2.005` becomes `2.01` in a
/// two-exponent currency and `0.5` becomes `1` in a zero-exponent one.
#[must_use]
pub fn round(amount: Decimal, currency: &Currency) -> Decimal {
    amount.round_dp_with_strategy(currency.exponent(), RoundingStrategy::MidpointAwayFromZero)
}

/// Round a monetary amount down to the minor unit of `currency`.
///
/// Used where an amount is an upper bound, so rounding must never push it
/// past the bound.
#[must_use]
pub fn round_down(amount: Decimal, currency: &Currency) -> Decimal {
    amount.round_dp_with_strategy(currency.exponent(), RoundingStrategy::ToZero)
}

/// Store-rate currency conversion consumed by the allocation handlers.
///
/// Implementations convert an amount from the given currency into the cart's
/// quote currency. The engine never inspects the rate itself; it only rounds
/// whatever comes back.
pub trait RateConverter: fmt::Debug + Send + Sync {
    /// Convert `amount` from `from` into the quote currency.
    fn convert(&self, amount: Decimal, from: &'static Currency) -> Decimal;
}

/// Conversion for stores whose quote and base currency coincide.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitRate;

impl RateConverter for UnitRate {
    fn convert(&self, amount: Decimal, _from: &'static Currency) -> Decimal {
        amount
    }
}

/// Conversion through a single fixed multiplier.
#[derive(Debug, Clone, Copy)]
pub struct FixedRate(pub Decimal);

impl RateConverter for FixedRate {
    fn convert(&self, amount: Decimal, _from: &'static Currency) -> Decimal {
        amount * self.0
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{JPY, USD};

    use super::*;

    #[test]
    fn round_to_two_minor_units() {
        assert_eq!(round(Decimal::new(2_005, 3), USD), Decimal::new(201, 2));
        assert_eq!(round(Decimal::new(2_004, 3), USD), Decimal::new(200, 2));
    }

    #[test]
    fn round_midpoint_away_from_zero_is_symmetric() {
        assert_eq!(round(Decimal::new(-2_675, 3), USD), Decimal::new(-268, 2));
        assert_eq!(round(Decimal::new(2_675, 3), USD), Decimal::new(268, 2));
    }

    #[test]
    fn round_respects_zero_exponent_currencies() {
        assert_eq!(round(Decimal::new(15, 1), JPY), Decimal::from(2));
    }

    #[test]
    fn round_down_never_exceeds_the_input() {
        assert_eq!(round_down(Decimal::new(3_339, 3), USD), Decimal::new(333, 2));
        assert_eq!(round_down(Decimal::new(3_331, 3), USD), Decimal::new(333, 2));
        assert_eq!(round_down(Decimal::new(19, 1), JPY), Decimal::from(1));
    }

    #[test]
    fn unit_rate_is_identity() {
        let amount = Decimal::new(1_234, 2);

        assert_eq!(UnitRate.convert(amount, USD), amount);
    }

    #[test]
    fn fixed_rate_multiplies() {
        let rate = FixedRate(Decimal::new(15, 1));

        assert_eq!(rate.convert(Decimal::from(10), USD), Decimal::from(15));
    }
}
