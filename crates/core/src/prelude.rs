//! Marque prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    actions::{ActionHandler, HandlerContext, registry},
    calculator::Calculator,
    cart::{Cart, CustomerId, Destination, FreeShipping, ItemId, LineItem},
    collector::{Collector, Pass},
    eligibility::{CouponLookup, EligibilityChecker, InMemoryCoupons, InMemoryUsage, UsageLookup},
    filter::select_items,
    money::{FixedRate, RateConverter, UnitRate, round},
    rules::{
        ActionKind, Conditions, Coupon, CouponId, CouponMode, FreeShippingGrant, MatchAll, Rule,
        RuleId, RuleSource, StaticRules,
    },
};
