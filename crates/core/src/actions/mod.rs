//! Allocation handlers
//!
//! The four discount-allocation strategies, each behind the common
//! [`ActionHandler`] trait. The orchestrator dispatches a rule to the first
//! registered handler whose kind matches; a rule with an unmatched kind is
//! silently not applied.
//!
//! Handlers mutate the selected items' accumulated discount fields and, for
//! the strategies that support it, the destination's shipping discounts.
//! Every money value is rounded to its currency's minor unit before being
//! written back, and every write goes to the four parallel fields (current
//! and original amount, in quote and base currency) so later pricing stages
//! can reconstruct both post- and pre-other-discount prices.

use std::fmt;

use rust_decimal::Decimal;
use rusty_money::iso::Currency;

use crate::{
    cart::{Destination, LineItem},
    money::RateConverter,
    rules::{ActionKind, Rule},
};

pub mod buy_x_get_y;
pub mod cart_fixed;
pub mod percent;
pub mod unit_fixed;

pub use buy_x_get_y::BuyXGetY;
pub use cart_fixed::CartFixed;
pub use percent::Percent;
pub use unit_fixed::UnitFixed;

/// Currencies and collaborators a handler draws on while allocating.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    /// Currency the customer sees.
    pub quote_currency: &'static Currency,

    /// Currency the store accounts in. Rule amounts are configured in this
    /// currency.
    pub base_currency: &'static Currency,

    /// Store-rate conversion from the base into the quote currency.
    pub converter: &'a dyn RateConverter,
}

/// One discount-allocation strategy.
pub trait ActionHandler: fmt::Debug + Send + Sync {
    /// The action kind this handler implements.
    fn kind(&self) -> ActionKind;

    /// Allocate `rule`'s discount onto the `selected` items of
    /// `destination`. Returns whether the rule applied.
    fn apply(
        &self,
        ctx: &HandlerContext<'_>,
        rule: &Rule,
        destination: &mut Destination,
        selected: &[usize],
    ) -> bool;
}

/// The default ordered handler registry, one handler per action kind.
///
/// Resolved once when the calculator is built; there is no runtime
/// extension point.
#[must_use]
pub fn registry() -> Vec<Box<dyn ActionHandler>> {
    vec![
        Box::new(UnitFixed),
        Box::new(Percent),
        Box::new(CartFixed),
        Box::new(BuyXGetY),
    ]
}

/// Quantity of `item` open to `rule`: the rule's discount-quantity cap when
/// one is set and smaller than the line quantity, the full quantity
/// otherwise.
fn rule_qty(rule: &Rule, item: &LineItem) -> Decimal {
    match rule.discount_qty {
        Some(cap) if cap < item.qty => cap,
        _ => item.qty,
    }
}

/// Truncate `qty` down to the nearest whole multiple of `step`. A
/// non-positive step leaves the quantity untouched.
fn step_qty(qty: Decimal, step: Decimal) -> Decimal {
    if step > Decimal::ZERO {
        (qty / step).floor() * step
    } else {
        qty
    }
}

/// Add a rounded, non-negative shipping discount, clamped so the remaining
/// shipping amount never goes negative. Returns the amounts actually
/// granted per currency.
fn discount_shipping(
    destination: &mut Destination,
    amount: Decimal,
    base_amount: Decimal,
) -> (Decimal, Decimal) {
    let (remaining, base_remaining) = destination.remaining_shipping();

    let granted = amount.max(Decimal::ZERO).min(remaining.max(Decimal::ZERO));
    let base_granted = base_amount
        .max(Decimal::ZERO)
        .min(base_remaining.max(Decimal::ZERO));

    destination.shipping_discount_amount += granted;
    destination.base_shipping_discount_amount += base_granted;

    (granted, base_granted)
}
