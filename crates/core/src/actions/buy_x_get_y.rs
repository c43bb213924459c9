//! Buy-X-get-Y allocation

use rust_decimal::Decimal;

use crate::{
    cart::Destination,
    money,
    rules::{ActionKind, Rule},
};

use super::{ActionHandler, HandlerContext, rule_qty};

/// Every `x + y` units, `y` of them are free.
///
/// The rule's step is `x`, the paid units, and its amount is `y`, the free
/// units. Each full block of `x + y` units grants `y` free units; in the
/// trailing partial block only the units beyond the first `x` are free, so
/// overflow always rounds in the payer's favor. Shipping is untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyXGetY;

impl ActionHandler for BuyXGetY {
    fn kind(&self) -> ActionKind {
        ActionKind::BuyXGetY
    }

    fn apply(
        &self,
        ctx: &HandlerContext<'_>,
        rule: &Rule,
        destination: &mut Destination,
        selected: &[usize],
    ) -> bool {
        let paid = rule.step;
        let free = rule.amount;

        if paid <= Decimal::ZERO || free <= Decimal::ZERO || selected.is_empty() {
            return false;
        }

        let block = paid + free;
        let mut applied = false;

        for &index in selected {
            let Some(item) = destination.items.get_mut(index) else {
                continue;
            };

            let qty = rule_qty(rule, item);
            let full_blocks = (qty / block).floor();
            let overflow = qty - full_blocks * block;
            let free_qty = full_blocks * free + (overflow - paid).max(Decimal::ZERO);

            if free_qty <= Decimal::ZERO {
                continue;
            }

            item.discount_amount += money::round(item.price * free_qty, ctx.quote_currency);
            item.base_discount_amount +=
                money::round(item.base_price * free_qty, ctx.base_currency);
            item.original_discount_amount +=
                money::round(item.original_price * free_qty, ctx.quote_currency);
            item.base_original_discount_amount +=
                money::round(item.base_original_price * free_qty, ctx.base_currency);

            applied = true;
        }

        applied
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::{fixtures, money::UnitRate, rules::RuleId};

    use super::*;

    fn ctx() -> HandlerContext<'static> {
        HandlerContext {
            quote_currency: USD,
            base_currency: USD,
            converter: &UnitRate,
        }
    }

    fn buy_x_get_y(paid: Decimal, free: Decimal) -> Rule {
        let mut rule = Rule::new(RuleId::new(), ActionKind::BuyXGetY, free);
        rule.step = paid;
        rule
    }

    #[test]
    fn grants_one_free_block_per_batch() -> TestResult {
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(4),
            Decimal::from(10),
        )]);

        let rule = buy_x_get_y(Decimal::from(2), Decimal::ONE);
        let applied = BuyXGetY.apply(&ctx(), &rule, &mut destination, &[0]);

        assert!(applied, "ten units hold three full batches");

        let item = destination.items.first().ok_or("missing line")?;

        // Three full batches of three grant three free units.
        assert_eq!(item.discount_amount, Decimal::from(12));
        assert_eq!(item.base_discount_amount, Decimal::from(12));

        Ok(())
    }

    #[test]
    fn too_few_units_grant_nothing() {
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(4),
            Decimal::from(2),
        )]);

        let rule = buy_x_get_y(Decimal::from(2), Decimal::ONE);
        let applied = BuyXGetY.apply(&ctx(), &rule, &mut destination, &[0]);

        assert!(!applied, "two units never fill a batch of three");
    }

    #[test]
    fn overflow_beyond_the_paid_units_is_free() -> TestResult {
        // Buy 1 get 2: batches of three, with one paid unit each.
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(10),
            Decimal::from(5),
        )]);

        let rule = buy_x_get_y(Decimal::ONE, Decimal::from(2));
        BuyXGetY.apply(&ctx(), &rule, &mut destination, &[0]);

        let item = destination.items.first().ok_or("missing line")?;

        // One full batch frees two units; the trailing two units hold one
        // paid unit, freeing one more.
        assert_eq!(item.discount_amount, Decimal::from(30));

        Ok(())
    }

    #[test]
    fn non_positive_parameters_are_not_applied() {
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(4),
            Decimal::from(10),
        )]);

        let rule = buy_x_get_y(Decimal::ZERO, Decimal::ONE);
        assert!(!BuyXGetY.apply(&ctx(), &rule, &mut destination, &[0]));

        let rule = buy_x_get_y(Decimal::from(2), Decimal::ZERO);
        assert!(!BuyXGetY.apply(&ctx(), &rule, &mut destination, &[0]));
    }

    #[test]
    fn quantity_cap_limits_the_batches() -> TestResult {
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(4),
            Decimal::from(10),
        )]);

        let mut rule = buy_x_get_y(Decimal::from(2), Decimal::ONE);
        rule.discount_qty = Some(Decimal::from(6));

        BuyXGetY.apply(&ctx(), &rule, &mut destination, &[0]);

        let item = destination.items.first().ok_or("missing line")?;

        // Six capped units hold two full batches.
        assert_eq!(item.discount_amount, Decimal::from(8));

        Ok(())
    }
}
