//! Rule orchestration
//!
//! Drives one rule at a time through eligibility, item selection, and the
//! matching allocation handler, then folds the resulting discounts into the
//! destination's running totals and records which rules were used.

use std::sync::Arc;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;

use crate::{
    actions::{self, ActionHandler, HandlerContext},
    cart::{Cart, Destination, FreeShipping, LineItem},
    eligibility::EligibilityChecker,
    filter,
    money::{self, RateConverter},
    rules::{CouponMode, FreeShippingGrant, Rule, RuleSource},
};

/// Key of one cached rule set: website, customer group, and coupon code.
type RuleKey = (u32, u32, Option<String>);

/// The rule orchestrator.
///
/// Holds the eligibility checker, the store-rate converter, the ordered
/// allocation-handler registry, and a keyed cache over the rule source so a
/// cart's applicable rules are fetched once per selection key.
#[derive(Debug)]
pub struct Calculator {
    eligibility: EligibilityChecker,
    converter: Arc<dyn RateConverter>,
    source: Arc<dyn RuleSource>,
    handlers: Vec<Box<dyn ActionHandler>>,
    cache: FxHashMap<RuleKey, Vec<Rule>>,
}

impl Calculator {
    /// Build a calculator with the default handler registry.
    #[must_use]
    pub fn new(
        eligibility: EligibilityChecker,
        converter: Arc<dyn RateConverter>,
        source: Arc<dyn RuleSource>,
    ) -> Self {
        Self {
            eligibility,
            converter,
            source,
            handlers: actions::registry(),
            cache: FxHashMap::default(),
        }
    }

    /// The rules applicable to `cart`, in priority order.
    ///
    /// Cached per (website, customer group, coupon code) key; `force_reload`
    /// drops the cached set and fetches a fresh one.
    pub fn rules(&mut self, cart: &Cart, force_reload: bool) -> &[Rule] {
        let key = (
            cart.website_id,
            cart.customer_group_id,
            cart.trimmed_coupon_code().map(str::to_string),
        );

        if force_reload || !self.cache.contains_key(&key) {
            let rules = self.source.rules_for(
                cart.website_id,
                cart.customer_group_id,
                cart.trimmed_coupon_code(),
            );

            self.cache.insert(key.clone(), rules);
        }

        self.cache.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Apply every rule in order, stopping early once a rule both applied
    /// and is flagged to stop further processing.
    pub fn apply_rules(&self, rules: &[Rule], cart: &mut Cart, destination_index: usize) {
        for rule in rules {
            let applied = self.apply_rule(rule, cart, destination_index);

            if applied && rule.stop_processing {
                break;
            }
        }
    }

    /// Apply a single rule to one destination of `cart`.
    ///
    /// Returns whether the rule applied. An ineligible rule, an empty
    /// selection without shipping involvement, or an action kind with no
    /// registered handler all yield `false` without mutating anything
    /// except the free-shipping grants, which follow eligibility alone.
    pub fn apply_rule(&self, rule: &Rule, cart: &mut Cart, destination_index: usize) -> bool {
        let Some(destination) = cart.destinations.get(destination_index) else {
            return false;
        };

        if !self.eligibility.can_apply(rule, cart, destination) {
            return false;
        }

        let selected = filter::select_items(rule, &destination.items);

        let quote_currency = cart.quote_currency;
        let base_currency = cart.base_currency;
        let coupon_code = cart.trimmed_coupon_code().map(str::to_string);

        let Some(destination) = cart.destinations.get_mut(destination_index) else {
            return false;
        };

        let ctx = HandlerContext {
            quote_currency,
            base_currency,
            converter: self.converter.as_ref(),
        };

        let (before, base_before) = item_discount_totals(destination);

        let applied = self
            .handlers
            .iter()
            .find(|handler| handler.kind() == rule.action)
            .is_some_and(|handler| handler.apply(&ctx, rule, destination, &selected));

        for &index in &selected {
            if let Some(item) = destination.items.get_mut(index) {
                fix_discounts(item, quote_currency, base_currency);
            }
        }

        let (after, base_after) = item_discount_totals(destination);

        destination.discount_amount += after - before;
        destination.base_discount_amount += base_after - base_before;
        destination.subtotal_with_discount = destination.subtotal - destination.discount_amount;
        destination.base_subtotal_with_discount =
            destination.base_subtotal - destination.base_discount_amount;

        match rule.free_shipping {
            FreeShippingGrant::None => {}
            FreeShippingGrant::MatchedItems => {
                for &index in &selected {
                    if let Some(item) = destination.items.get_mut(index) {
                        grant_item_free_shipping(item, rule.discount_qty);
                    }
                }
            }
            FreeShippingGrant::Destination => destination.free_shipping = true,
        }

        if applied {
            if rule.coupon_mode == CouponMode::Required {
                destination.coupon_code = coupon_code.clone();
            }

            cart.applied_rule_ids.insert(rule.id);
            destination.applied_rule_ids.insert(rule.id);

            for &index in &selected {
                if let Some(item) = destination.items.get_mut(index) {
                    item.applied_rule_ids.insert(rule.id);
                }
            }

            if !destination
                .descriptions
                .iter()
                .any(|(id, _)| *id == rule.id)
                && let Some(label) = rule.label.clone().or(coupon_code)
            {
                destination.descriptions.push((rule.id, label));
            }
        }

        applied
    }
}

/// Sum of the items' accumulated discounts, per currency.
fn item_discount_totals(destination: &Destination) -> (Decimal, Decimal) {
    destination
        .items
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(quote, base), item| {
            (
                quote + item.discount_amount,
                base + item.base_discount_amount,
            )
        })
}

/// Round the accumulated discounts and cap each at its own row total.
fn fix_discounts(item: &mut LineItem, quote: &Currency, base: &Currency) {
    item.discount_amount = money::round(item.discount_amount, quote)
        .max(Decimal::ZERO)
        .min(item.row_total());

    item.base_discount_amount = money::round(item.base_discount_amount, base)
        .max(Decimal::ZERO)
        .min(item.base_row_total());

    item.original_discount_amount = money::round(item.original_discount_amount, quote)
        .max(Decimal::ZERO)
        .min(item.original_row_total());

    item.base_original_discount_amount = money::round(item.base_original_discount_amount, base)
        .max(Decimal::ZERO)
        .min(item.base_original_row_total());
}

/// Upgrade a line's free-shipping entitlement; grants never downgrade one
/// already held.
fn grant_item_free_shipping(item: &mut LineItem, qty_cap: Option<Decimal>) {
    let granted = match qty_cap {
        Some(cap) if cap < item.qty => FreeShipping::UpToQty(cap),
        _ => FreeShipping::Yes,
    };

    item.free_shipping = match (item.free_shipping, granted) {
        (FreeShipping::Yes, _) | (_, FreeShipping::Yes) => FreeShipping::Yes,
        (FreeShipping::UpToQty(held), FreeShipping::UpToQty(new)) => {
            FreeShipping::UpToQty(held.max(new))
        }
        (FreeShipping::No, granted) => granted,
        (held, FreeShipping::No) => held,
    };
}
