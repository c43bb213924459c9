//! Rule eligibility
//!
//! Decides whether a rule may apply to a destination at all: coupon
//! validity, global and per-customer usage caps, and finally the rule's own
//! condition predicate. Pure decision, no side effects.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{
    cart::{Cart, CustomerId, Destination},
    rules::{Coupon, CouponId, CouponMode, Rule, RuleId},
};

/// Lookup of coupon records by code.
pub trait CouponLookup: fmt::Debug + Send + Sync {
    /// The coupon registered under `code`, if any.
    fn coupon_by_code(&self, code: &str) -> Option<Coupon>;
}

/// Lookup of per-customer usage counts recorded at order placement.
pub trait UsageLookup: fmt::Debug + Send + Sync {
    /// Times `customer` has used `rule`.
    fn rule_times_used(&self, customer: CustomerId, rule: RuleId) -> u64;

    /// Times `customer` has used `coupon`.
    fn coupon_times_used(&self, customer: CustomerId, coupon: CouponId) -> u64;
}

/// Coupon directory held in memory, for tests and usage snapshots.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCoupons {
    coupons: FxHashMap<String, Coupon>,
}

impl InMemoryCoupons {
    /// Register a coupon under its code.
    pub fn insert(&mut self, coupon: Coupon) {
        self.coupons.insert(coupon.code.clone(), coupon);
    }
}

impl CouponLookup for InMemoryCoupons {
    fn coupon_by_code(&self, code: &str) -> Option<Coupon> {
        self.coupons.get(code).cloned()
    }
}

/// Usage counts held in memory, for tests and usage snapshots.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUsage {
    rule_counts: FxHashMap<(CustomerId, RuleId), u64>,
    coupon_counts: FxHashMap<(CustomerId, CouponId), u64>,
}

impl InMemoryUsage {
    /// Record how often a customer has used a rule.
    pub fn set_rule_count(&mut self, customer: CustomerId, rule: RuleId, count: u64) {
        self.rule_counts.insert((customer, rule), count);
    }

    /// Record how often a customer has used a coupon.
    pub fn set_coupon_count(&mut self, customer: CustomerId, coupon: CouponId, count: u64) {
        self.coupon_counts.insert((customer, coupon), count);
    }
}

impl UsageLookup for InMemoryUsage {
    fn rule_times_used(&self, customer: CustomerId, rule: RuleId) -> u64 {
        self.rule_counts.get(&(customer, rule)).copied().unwrap_or(0)
    }

    fn coupon_times_used(&self, customer: CustomerId, coupon: CouponId) -> u64 {
        self.coupon_counts
            .get(&(customer, coupon))
            .copied()
            .unwrap_or(0)
    }
}

/// Decides rule applicability for a destination.
#[derive(Debug, Clone)]
pub struct EligibilityChecker {
    coupons: Arc<dyn CouponLookup>,
    usage: Arc<dyn UsageLookup>,
}

impl EligibilityChecker {
    /// Build a checker over the given coupon directory and usage counts.
    #[must_use]
    pub fn new(coupons: Arc<dyn CouponLookup>, usage: Arc<dyn UsageLookup>) -> Self {
        Self { coupons, usage }
    }

    /// Whether `rule` may apply to `destination`.
    ///
    /// Every failed pre-check yields `false`, never an error. When all
    /// pre-checks pass, the rule's own destination conditions give the
    /// final answer.
    #[must_use]
    pub fn can_apply(&self, rule: &Rule, cart: &Cart, destination: &Destination) -> bool {
        if rule.coupon_mode == CouponMode::Required {
            let Some(code) = cart.trimmed_coupon_code() else {
                return false;
            };

            let Some(coupon) = self.coupons.coupon_by_code(code) else {
                return false;
            };

            if coupon.rule_id != rule.id {
                return false;
            }

            if let Some(limit) = coupon.usage_limit
                && coupon.times_used >= u64::from(limit)
            {
                return false;
            }

            if let Some(per_customer) = coupon.usage_per_customer
                && let Some(customer) = cart.customer_id
                && self.usage.coupon_times_used(customer, coupon.id) >= u64::from(per_customer)
            {
                return false;
            }
        }

        if let Some(limit) = rule.usage_limit
            && rule.times_used >= u64::from(limit)
        {
            return false;
        }

        if let Some(per_customer) = rule.uses_per_customer
            && let Some(customer) = cart.customer_id
            && self.usage.rule_times_used(customer, rule.id) >= u64::from(per_customer)
        {
            return false;
        }

        rule.conditions.matches_destination(cart, destination)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::{
        cart::Destination,
        fixtures,
        rules::{ActionKind, Rule, RuleId},
    };

    use super::*;

    fn checker(coupons: InMemoryCoupons, usage: InMemoryUsage) -> EligibilityChecker {
        EligibilityChecker::new(Arc::new(coupons), Arc::new(usage))
    }

    fn percent_rule() -> Rule {
        Rule::new(RuleId::new(), ActionKind::Percent, Decimal::from(10))
    }

    fn coupon_for(rule: &Rule, code: &str) -> Coupon {
        Coupon {
            id: CouponId::new(),
            code: code.to_string(),
            rule_id: rule.id,
            usage_limit: None,
            times_used: 0,
            usage_per_customer: None,
        }
    }

    #[test]
    fn coupon_rule_without_code_is_rejected() {
        let mut rule = percent_rule();
        rule.coupon_mode = CouponMode::Required;

        let cart = fixtures::cart(Destination::default());
        let checker = checker(InMemoryCoupons::default(), InMemoryUsage::default());

        assert!(!checker.can_apply(&rule, &cart, &Destination::default()));
    }

    #[test]
    fn coupon_rule_with_unknown_code_is_rejected() {
        let mut rule = percent_rule();
        rule.coupon_mode = CouponMode::Required;

        let mut cart = fixtures::cart(Destination::default());
        cart.coupon_code = Some("MISSING".to_string());

        let checker = checker(InMemoryCoupons::default(), InMemoryUsage::default());

        assert!(!checker.can_apply(&rule, &cart, &Destination::default()));
    }

    #[test]
    fn coupon_owned_by_other_rule_is_rejected() {
        let mut rule = percent_rule();
        rule.coupon_mode = CouponMode::Required;

        let other = percent_rule();
        let mut coupons = InMemoryCoupons::default();
        coupons.insert(coupon_for(&other, "SAVE10"));

        let mut cart = fixtures::cart(Destination::default());
        cart.coupon_code = Some("SAVE10".to_string());

        let checker = checker(coupons, InMemoryUsage::default());

        assert!(!checker.can_apply(&rule, &cart, &Destination::default()));
    }

    #[test]
    fn exhausted_coupon_is_rejected() {
        let mut rule = percent_rule();
        rule.coupon_mode = CouponMode::Required;

        let mut coupon = coupon_for(&rule, "SAVE10");
        coupon.usage_limit = Some(5);
        coupon.times_used = 5;

        let mut coupons = InMemoryCoupons::default();
        coupons.insert(coupon);

        let mut cart = fixtures::cart(Destination::default());
        cart.coupon_code = Some("SAVE10".to_string());

        let checker = checker(coupons, InMemoryUsage::default());

        assert!(!checker.can_apply(&rule, &cart, &Destination::default()));
    }

    #[test]
    fn coupon_per_customer_cap_applies_to_logged_in_customers_only() {
        let mut rule = percent_rule();
        rule.coupon_mode = CouponMode::Required;

        let mut coupon = coupon_for(&rule, "SAVE10");
        coupon.usage_per_customer = Some(1);
        let coupon_id = coupon.id;

        let mut coupons = InMemoryCoupons::default();
        coupons.insert(coupon);

        let customer = CustomerId::new();
        let mut usage = InMemoryUsage::default();
        usage.set_coupon_count(customer, coupon_id, 1);

        let mut cart = fixtures::cart(Destination::default());
        cart.coupon_code = Some("SAVE10".to_string());

        let checker = checker(coupons, usage);

        // Guests are not subject to per-customer caps.
        assert!(checker.can_apply(&rule, &cart, &Destination::default()));

        cart.customer_id = Some(customer);
        assert!(!checker.can_apply(&rule, &cart, &Destination::default()));
    }

    #[test]
    fn rule_per_customer_cap_is_enforced() {
        let mut rule = percent_rule();
        rule.uses_per_customer = Some(1);

        let customer = CustomerId::new();
        let mut usage = InMemoryUsage::default();
        usage.set_rule_count(customer, rule.id, 1);

        let mut cart = fixtures::cart(Destination::default());
        cart.customer_id = Some(customer);

        let checker = checker(InMemoryCoupons::default(), usage);

        assert!(!checker.can_apply(&rule, &cart, &Destination::default()));
    }

    #[test]
    fn rule_global_cap_is_enforced() {
        let mut rule = percent_rule();
        rule.usage_limit = Some(100);
        rule.times_used = 100;

        let cart = fixtures::cart(Destination::default());
        let checker = checker(InMemoryCoupons::default(), InMemoryUsage::default());

        assert!(!checker.can_apply(&rule, &cart, &Destination::default()));
    }

    #[test]
    fn conditions_give_the_final_answer() {
        let mut rule = percent_rule();
        rule.conditions = Arc::new(fixtures::MatchNone);

        let cart = fixtures::cart(Destination::default());
        let checker = checker(InMemoryCoupons::default(), InMemoryUsage::default());

        assert!(!checker.can_apply(&rule, &cart, &Destination::default()));
    }
}
