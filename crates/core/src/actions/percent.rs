//! Percentage allocation

use rust_decimal::Decimal;

use crate::{
    cart::Destination,
    money,
    rules::{ActionKind, Rule},
};

use super::{ActionHandler, HandlerContext, discount_shipping, rule_qty, step_qty};

/// A percentage off the remaining undiscounted row amount.
///
/// Each of the four discount lanes compounds on its own remainder: the row
/// price of that lane minus the discount already accumulated there. Rules
/// applied in sequence therefore discount the amount still owed, not the
/// original price over and over.
#[derive(Debug, Clone, Copy, Default)]
pub struct Percent;

impl ActionHandler for Percent {
    fn kind(&self) -> ActionKind {
        ActionKind::Percent
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

        let percent = rule.amount.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
        let ratio = percent / Decimal::ONE_HUNDRED;

        let mut applied = false;

        for &index in selected {
            let Some(item) = destination.items.get_mut(index) else {
                continue;
            };

            let qty = step_qty(rule_qty(rule, item), rule.step);

            if qty <= Decimal::ZERO {
                continue;
            }

            let discount = money::round(
                ((item.price * qty - item.discount_amount) * ratio).max(Decimal::ZERO),
                ctx.quote_currency,
            );

            let base_discount = money::round(
                ((item.base_price * qty - item.base_discount_amount) * ratio).max(Decimal::ZERO),
                ctx.base_currency,
            );

            let original_discount = money::round(
                ((item.original_price * qty - item.original_discount_amount) * ratio)
                    .max(Decimal::ZERO),
                ctx.quote_currency,
            );

            let base_original_discount = money::round(
                ((item.base_original_price * qty - item.base_original_discount_amount) * ratio)
                    .max(Decimal::ZERO),
                ctx.base_currency,
            );

            item.discount_amount += discount;
            item.base_discount_amount += base_discount;
            item.original_discount_amount += original_discount;
            item.base_original_discount_amount += base_original_discount;

            item.discount_percent = (item.discount_percent + percent).min(Decimal::ONE_HUNDRED);

            applied = true;
        }

        if rule.apply_to_shipping {
            let (remaining, base_remaining) = destination.remaining_shipping();

            let (granted, base_granted) = discount_shipping(
                destination,
                money::round(remaining * ratio, ctx.quote_currency),
                money::round(base_remaining * ratio, ctx.base_currency),
            );

            applied |= granted > Decimal::ZERO || base_granted > Decimal::ZERO;
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

    fn rule(percent: Decimal) -> Rule {
        Rule::new(RuleId::new(), ActionKind::Percent, percent)
    }

    #[test]
    fn discounts_a_share_of_the_row() -> TestResult {
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(20),
            Decimal::from(2),
        )]);

        let applied = Percent.apply(&ctx(), &rule(Decimal::from(25)), &mut destination, &[0]);

        assert!(applied, "handler should report application");

        let item = destination.items.first().ok_or("missing line")?;

        assert_eq!(item.discount_amount, Decimal::from(10));
        assert_eq!(item.base_discount_amount, Decimal::from(10));
        assert_eq!(item.discount_percent, Decimal::from(25));

        Ok(())
    }

    #[test]
    fn compounds_on_the_remaining_amount() -> TestResult {
        let mut item = fixtures::line_item("a", Decimal::from(20), Decimal::ONE);

        // A previous rule already took five dollars off the row.
        item.discount_amount = Decimal::from(5);
        item.base_discount_amount = Decimal::from(5);

        let mut destination = fixtures::destination(vec![item]);

        Percent.apply(&ctx(), &rule(Decimal::from(50)), &mut destination, &[0]);

        let item = destination.items.first().ok_or("missing line")?;

        // 50% of the remaining 15, not of the original 20.
        assert_eq!(item.discount_amount, Decimal::new(1250, 2));
        // The original lane carried no prior discount.
        assert_eq!(item.original_discount_amount, Decimal::from(10));

        Ok(())
    }

    #[test]
    fn percent_is_clamped_to_valid_range() -> TestResult {
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(10),
            Decimal::ONE,
        )]);

        Percent.apply(&ctx(), &rule(Decimal::from(150)), &mut destination, &[0]);

        let item = destination.items.first().ok_or("missing line")?;

        assert_eq!(item.discount_amount, Decimal::from(10));
        assert_eq!(item.discount_percent, Decimal::ONE_HUNDRED);

        Ok(())
    }

    #[test]
    fn discount_percent_accumulates_and_caps_at_one_hundred() -> TestResult {
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(10),
            Decimal::ONE,
        )]);

        Percent.apply(&ctx(), &rule(Decimal::from(60)), &mut destination, &[0]);
        Percent.apply(&ctx(), &rule(Decimal::from(60)), &mut destination, &[0]);

        let item = destination.items.first().ok_or("missing line")?;

        assert_eq!(item.discount_percent, Decimal::ONE_HUNDRED);

        Ok(())
    }

    #[test]
    fn shipping_share_is_rounded_and_clamped() {
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(10),
            Decimal::ONE,
        )]);

        destination.shipping_amount = Decimal::new(1001, 2);
        destination.base_shipping_amount = Decimal::new(1001, 2);

        let mut rule = rule(Decimal::from(50));
        rule.apply_to_shipping = true;

        Percent.apply(&ctx(), &rule, &mut destination, &[0]);

        // Half of 10.01 rounds to 5.01 and fits within the remainder.
        assert_eq!(destination.shipping_discount_amount, Decimal::new(501, 2));
    }

    #[test]
    fn step_quantity_gates_small_lines() -> TestResult {
        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(10),
            Decimal::from(2),
        )]);

        let mut rule = rule(Decimal::from(50));
        rule.step = Decimal::from(3);

        let applied = Percent.apply(&ctx(), &rule, &mut destination, &[0]);

        assert!(!applied, "two units cannot fill a batch of three");

        let item = destination.items.first().ok_or("missing line")?;

        assert_eq!(item.discount_amount, Decimal::ZERO);

        Ok(())
    }
}
