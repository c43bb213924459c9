//! Discount collection
//!
//! The per-destination entry point of a pricing pass. A [`Collector`] resets
//! the destination's discount state, runs every applicable rule through the
//! calculator, folds the item and shipping discounts into the destination
//! totals, joins the discount description, and derives the free-shipping
//! flag.

use rust_decimal::Decimal;

use crate::{
    calculator::Calculator,
    cart::{Cart, Destination, FreeShipping},
    rules::Rule,
};

/// One-shot reset markers for a single calculation pass.
///
/// Construct a fresh pass per calculation. The cart-level applied-rule
/// reset happens at most once per pass, no matter how many destinations
/// are collected or how often; reapplying from scratch is the caller's
/// explicit choice, made by starting a new pass.
#[derive(Debug, Default)]
pub struct Pass {
    cart_reset: bool,
}

impl Pass {
    /// A fresh pass with no resets performed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The discount collector.
#[derive(Debug)]
pub struct Collector {
    calculator: Calculator,
}

impl Collector {
    /// Build a collector over the given calculator.
    #[must_use]
    pub fn new(calculator: Calculator) -> Self {
        Self { calculator }
    }

    /// Calculate all discounts for one destination of `cart`.
    ///
    /// The destination and its items are re-zeroed and recomputed in full,
    /// so calling this again within the same pass lands on identical
    /// totals.
    pub fn collect(&mut self, pass: &mut Pass, cart: &mut Cart, destination_index: usize) {
        if !pass.cart_reset {
            cart.applied_rule_ids.clear();
            pass.cart_reset = true;
        }

        let rules: Vec<Rule> = self.calculator.rules(cart, false).to_vec();

        let Some(destination) = cart.destinations.get_mut(destination_index) else {
            return;
        };

        reset(destination);

        self.calculator.apply_rules(&rules, cart, destination_index);

        if let Some(destination) = cart.destinations.get_mut(destination_index) {
            finalize(destination);
        }
    }
}

/// Zero every discount field on the destination and its items.
fn reset(destination: &mut Destination) {
    destination.discount_amount = Decimal::ZERO;
    destination.base_discount_amount = Decimal::ZERO;
    destination.shipping_discount_amount = Decimal::ZERO;
    destination.base_shipping_discount_amount = Decimal::ZERO;
    destination.subtotal_with_discount = destination.subtotal;
    destination.base_subtotal_with_discount = destination.base_subtotal;
    destination.free_shipping = false;
    destination.coupon_code = None;
    destination.applied_rule_ids.clear();
    destination.descriptions.clear();
    destination.discount_description.clear();

    for item in &mut destination.items {
        item.discount_amount = Decimal::ZERO;
        item.base_discount_amount = Decimal::ZERO;
        item.original_discount_amount = Decimal::ZERO;
        item.base_original_discount_amount = Decimal::ZERO;
        item.discount_percent = Decimal::ZERO;
        item.free_shipping = FreeShipping::No;
        item.applied_rule_ids.clear();
    }
}

/// Fold item and shipping discounts into the destination totals, join the
/// description, and derive the free-shipping flag.
fn finalize(destination: &mut Destination) {
    let (items_total, base_items_total) = destination.items.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(quote, base), item| {
            (
                quote + item.discount_amount,
                base + item.base_discount_amount,
            )
        },
    );

    destination.subtotal_with_discount = destination.subtotal - items_total;
    destination.base_subtotal_with_discount = destination.base_subtotal - base_items_total;

    destination.discount_amount = items_total + destination.shipping_discount_amount;
    destination.base_discount_amount =
        base_items_total + destination.base_shipping_discount_amount;

    let mut labels: Vec<&str> = Vec::with_capacity(destination.descriptions.len());

    for (_, label) in &destination.descriptions {
        if !labels.contains(&label.as_str()) {
            labels.push(label);
        }
    }

    destination.discount_description = labels.join(", ");

    if !destination.free_shipping {
        destination.free_shipping = !destination.items.is_empty()
            && destination
                .items
                .iter()
                .all(|item| item.free_shipping.covers(item.qty));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use testresult::TestResult;

    use crate::{
        eligibility::{EligibilityChecker, InMemoryCoupons, InMemoryUsage},
        fixtures,
        money::UnitRate,
        rules::{ActionKind, CouponMode, FreeShippingGrant, RuleId, StaticRules},
    };

    use super::*;

    fn collector(rules: Vec<Rule>) -> Collector {
        Collector::new(Calculator::new(
            EligibilityChecker::new(
                Arc::new(InMemoryCoupons::default()),
                Arc::new(InMemoryUsage::default()),
            ),
            Arc::new(UnitRate),
            Arc::new(StaticRules(rules)),
        ))
    }

    fn labelled_percent(label: &str, percent: Decimal) -> Rule {
        let mut rule = Rule::new(RuleId::new(), ActionKind::Percent, percent);
        rule.label = Some(label.to_string());
        rule
    }

    #[test]
    fn collect_folds_discounts_into_the_totals() -> TestResult {
        let mut cart = fixtures::cart(fixtures::destination(vec![
            fixtures::line_item("a", Decimal::from(10), Decimal::from(2)),
            fixtures::line_item("b", Decimal::from(5), Decimal::from(2)),
        ]));

        let mut collector = collector(vec![labelled_percent("Ten off", Decimal::from(10))]);
        let mut pass = Pass::new();

        collector.collect(&mut pass, &mut cart, 0);

        let destination = cart.destinations.first().ok_or("missing destination")?;

        assert_eq!(destination.discount_amount, Decimal::from(3));
        assert_eq!(destination.subtotal_with_discount, Decimal::from(27));
        assert_eq!(destination.discount_description, "Ten off");

        Ok(())
    }

    #[test]
    fn collect_twice_in_one_pass_is_idempotent() -> TestResult {
        let mut cart = fixtures::cart(fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(20),
            Decimal::ONE,
        )]));

        let mut collector = collector(vec![
            labelled_percent("Half", Decimal::from(50)),
            labelled_percent("Quarter", Decimal::from(25)),
        ]);

        let mut pass = Pass::new();

        collector.collect(&mut pass, &mut cart, 0);

        let destination = cart.destinations.first().ok_or("missing destination")?;
        let once = (
            destination.discount_amount,
            destination.subtotal_with_discount,
            destination.discount_description.clone(),
        );

        collector.collect(&mut pass, &mut cart, 0);

        let destination = cart.destinations.first().ok_or("missing destination")?;

        assert_eq!(
            (
                destination.discount_amount,
                destination.subtotal_with_discount,
                destination.discount_description.clone(),
            ),
            once
        );

        Ok(())
    }

    #[test]
    fn coupon_gated_rules_need_a_code_on_the_cart() -> TestResult {
        let mut rule = labelled_percent("Gated", Decimal::from(50));
        rule.coupon_mode = CouponMode::Required;

        let mut cart = fixtures::cart(fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(10),
            Decimal::ONE,
        )]));

        let mut collector = collector(vec![rule]);
        let mut pass = Pass::new();

        collector.collect(&mut pass, &mut cart, 0);

        let destination = cart.destinations.first().ok_or("missing destination")?;

        assert_eq!(destination.discount_amount, Decimal::ZERO);
        assert!(destination.applied_rule_ids.is_empty());

        Ok(())
    }

    #[test]
    fn shipping_discounts_count_toward_the_total() -> TestResult {
        let mut rule = labelled_percent("Half everything", Decimal::from(50));
        rule.apply_to_shipping = true;

        let mut destination = fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(10),
            Decimal::ONE,
        )]);

        destination.shipping_amount = Decimal::from(8);
        destination.base_shipping_amount = Decimal::from(8);

        let mut cart = fixtures::cart(destination);
        let mut collector = collector(vec![rule]);
        let mut pass = Pass::new();

        collector.collect(&mut pass, &mut cart, 0);

        let destination = cart.destinations.first().ok_or("missing destination")?;

        assert_eq!(destination.shipping_discount_amount, Decimal::from(4));
        assert_eq!(destination.discount_amount, Decimal::from(9));
        // The subtotal only carries the item share.
        assert_eq!(destination.subtotal_with_discount, Decimal::from(5));

        Ok(())
    }

    #[test]
    fn free_shipping_needs_every_item_covered() -> TestResult {
        let mut rule = labelled_percent("Ship free", Decimal::from(10));
        rule.free_shipping = FreeShippingGrant::MatchedItems;
        rule.conditions = Arc::new(fixtures::SkuIn(vec!["a".to_string()]));

        let mut cart = fixtures::cart(fixtures::destination(vec![
            fixtures::line_item("a", Decimal::from(10), Decimal::ONE),
            fixtures::line_item("b", Decimal::from(10), Decimal::ONE),
        ]));

        let mut collector = collector(vec![rule]);
        let mut pass = Pass::new();

        collector.collect(&mut pass, &mut cart, 0);

        let destination = cart.destinations.first().ok_or("missing destination")?;

        assert!(
            !destination.free_shipping,
            "line b was never granted free shipping"
        );

        Ok(())
    }

    #[test]
    fn free_shipping_is_derived_when_all_items_are_covered() -> TestResult {
        let mut rule = labelled_percent("Ship free", Decimal::from(10));
        rule.free_shipping = FreeShippingGrant::MatchedItems;

        let mut cart = fixtures::cart(fixtures::destination(vec![
            fixtures::line_item("a", Decimal::from(10), Decimal::ONE),
            fixtures::line_item("b", Decimal::from(10), Decimal::ONE),
        ]));

        let mut collector = collector(vec![rule]);
        let mut pass = Pass::new();

        collector.collect(&mut pass, &mut cart, 0);

        let destination = cart.destinations.first().ok_or("missing destination")?;

        assert!(destination.free_shipping);

        Ok(())
    }

    #[test]
    fn a_new_pass_clears_state_from_the_previous_one() -> TestResult {
        let rule = labelled_percent("Ten off", Decimal::from(10));

        let mut cart = fixtures::cart(fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(10),
            Decimal::ONE,
        )]));

        let mut collector = collector(vec![rule.clone()]);

        let mut pass = Pass::new();
        collector.collect(&mut pass, &mut cart, 0);

        let mut pass = Pass::new();
        collector.collect(&mut pass, &mut cart, 0);

        let destination = cart.destinations.first().ok_or("missing destination")?;

        assert_eq!(destination.discount_amount, Decimal::ONE);
        assert_eq!(cart.applied_rule_ids.len(), 1);

        Ok(())
    }

    #[test]
    fn duplicate_labels_appear_once_in_the_description() -> TestResult {
        let mut cart = fixtures::cart(fixtures::destination(vec![fixtures::line_item(
            "a",
            Decimal::from(100),
            Decimal::ONE,
        )]));

        let mut collector = collector(vec![
            labelled_percent("Sale", Decimal::from(10)),
            labelled_percent("Sale", Decimal::from(10)),
        ]);

        let mut pass = Pass::new();

        collector.collect(&mut pass, &mut cart, 0);

        let destination = cart.destinations.first().ok_or("missing destination")?;

        assert_eq!(destination.discount_description, "Sale");

        Ok(())
    }
}
