//! Flat-per-unit allocation

use rust_decimal::Decimal;

use crate::{
    cart::Destination,
    money,
    rules::{ActionKind, Rule},
};

use super::{ActionHandler, HandlerContext, discount_shipping, rule_qty, step_qty};

/// A fixed amount off every discountable unit.
///
/// The rule amount is money in the base currency; the quote-currency amount
/// goes through the store-rate converter before rounding. A step quantity
/// truncates the discountable quantity down to whole batches first, and
/// lines whose truncated quantity is zero are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitFixed;

impl ActionHandler for UnitFixed {
    fn kind(&self) -> ActionKind {
        ActionKind::UnitFixed
    }

    fn apply(
        &self,
        ctx: &HandlerContext<'_>,
        rule: &Rule,
        destination: &mut Destination,
        selected: &[usize],
    ) -> bool {
        if selected.is_empty() && !rule.apply_to_shipping {
            return false;
        }

        let base_unit = money::round(rule.amount, ctx.base_currency);
        let quote_unit = money::round(
            ctx.converter.convert(rule.amount, ctx.base_currency),
            ctx.quote_currency,
        );

        let mut applied = false;
        let mut last_discount = Decimal::ZERO;
        let mut last_base_discount = Decimal::ZERO;

        for &index in selected {
            let Some(item) = destination.items.get_mut(index) else {
                continue;
            };

            let qty = step_qty(rule_qty(rule, item), rule.step);

            if qty <= Decimal::ZERO {
                continue;
            }

            let discount = money::round(quote_unit * qty, ctx.quote_currency);
            let base_discount = money::round(base_unit * qty, ctx.base_currency);

            item.discount_amount += discount;
            item.base_discount_amount += base_discount;
            item.original_discount_amount += discount;
            item.base_original_discount_amount += base_discount;

            last_discount = discount;
            last_base_discount = base_discount;
            applied = true;
        }

        if rule.apply_to_shipping {
            let (granted, base_granted) =
                discount_shipping(destination, last_discount, last_base_discount);

            applied |= granted > Decimal::ZERO || base_granted > Decimal::ZERO;
        }

        applied
    }
}
