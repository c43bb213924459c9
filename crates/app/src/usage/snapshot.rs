//! Usage snapshot
//!
//! An in-memory snapshot of the counts relevant to one cart, bridging the
//! async store into the engine's synchronous lookup traits. Load it once
//! before a pricing pass and hand it to the eligibility checker.

use marque::{
    cart::CustomerId,
    eligibility::{CouponLookup, UsageLookup},
    rules::{Coupon, CouponId, RuleId},
};
use rustc_hash::FxHashMap;

/// Persisted usage counts frozen at load time.
#[derive(Debug, Clone, Default)]
pub struct UsageSnapshot {
    coupon: Option<Coupon>,
    rule_counts: FxHashMap<(CustomerId, RuleId), u64>,
    coupon_counts: FxHashMap<(CustomerId, CouponId), u64>,
}

impl UsageSnapshot {
    /// The snapshotted coupon, when the cart's code matched a row.
    pub fn coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    pub(crate) fn set_coupon(&mut self, coupon: Coupon) {
        self.coupon = Some(coupon);
    }

    pub(crate) fn set_rule_count(&mut self, customer: CustomerId, rule: RuleId, count: u64) {
        self.rule_counts.insert((customer, rule), count);
    }

    pub(crate) fn set_coupon_count(&mut self, customer: CustomerId, coupon: CouponId, count: u64) {
        self.coupon_counts.insert((customer, coupon), count);
    }
}

impl CouponLookup for UsageSnapshot {
    fn coupon_by_code(&self, code: &str) -> Option<Coupon> {
        self.coupon
            .as_ref()
            .filter(|coupon| coupon.code == code)
            .cloned()
    }
}

impl UsageLookup for UsageSnapshot {
    fn rule_times_used(&self, customer: CustomerId, rule: RuleId) -> u64 {
        self.rule_counts
            .get(&(customer, rule))
            .copied()
            .unwrap_or(0)
    }

    fn coupon_times_used(&self, customer: CustomerId, coupon: CouponId) -> u64 {
        self.coupon_counts
            .get(&(customer, coupon))
            .copied()
            .unwrap_or(0)
    }
}
