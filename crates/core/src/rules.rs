//! Promotional rules and coupons

use std::{fmt, sync::Arc};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    cart::{Cart, Destination, LineItem},
    ids::TypedUuid,
};

/// Identifier of a promotional rule.
pub type RuleId = TypedUuid<Rule>;

/// Identifier of a coupon.
pub type CouponId = TypedUuid<Coupon>;

/// The allocation strategy a rule uses to spread its discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A fixed amount off every discountable unit.
    UnitFixed,

    /// A percentage off the remaining undiscounted row amount.
    Percent,

    /// A single fixed amount split across the whole selection.
    CartFixed,

    /// Every `(x + y)` units, `y` of them are free.
    BuyXGetY,
}

/// Whether a rule is gated behind a coupon code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponMode {
    /// The rule applies without any coupon.
    #[default]
    None,

    /// The cart must carry a valid coupon owned by this rule.
    Required,
}

/// Free-shipping grant attached to a rule, applied on eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeShippingGrant {
    /// No grant.
    #[default]
    None,

    /// Mark the items the rule selected as shipping free.
    MatchedItems,

    /// Mark the whole destination as shipping free.
    Destination,
}

/// Condition predicate attached to a rule.
///
/// The destination-level predicate decides whether the rule applies to a
/// cart at all; the item-level predicate narrows which lines it touches.
/// Condition trees are authored and evaluated outside the engine; only the
/// boolean verdicts are consumed here.
pub trait Conditions: fmt::Debug + Send + Sync {
    /// Whether the rule's cart-level conditions hold for this destination.
    fn matches_destination(&self, cart: &Cart, destination: &Destination) -> bool;

    /// Whether the rule's action conditions select this line.
    fn matches_item(&self, item: &LineItem) -> bool;
}

/// Conditions that match every destination and every item.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl Conditions for MatchAll {
    fn matches_destination(&self, _cart: &Cart, _destination: &Destination) -> bool {
        true
    }

    fn matches_item(&self, _item: &LineItem) -> bool {
        true
    }
}

/// A configured discount definition.
///
/// The meaning of [`amount`](Self::amount) and [`step`](Self::step) depends
/// on the action kind: for [`ActionKind::UnitFixed`] and
/// [`ActionKind::CartFixed`] the amount is money in the base currency and
/// the step truncates quantities; for [`ActionKind::Percent`] the amount is
/// a percentage; for [`ActionKind::BuyXGetY`] the step is `x` (paid units)
/// and the amount is `y` (free units).
#[derive(Debug, Clone)]
pub struct Rule {
    /// Rule identifier.
    pub id: RuleId,

    /// Display label recorded on destinations the rule applies to.
    pub label: Option<String>,

    /// Allocation strategy.
    pub action: ActionKind,

    /// Primary numeric parameter.
    pub amount: Decimal,

    /// Step-quantity parameter.
    pub step: Decimal,

    /// Cap on the quantity a single line may have discounted.
    pub discount_qty: Option<Decimal>,

    /// Whether leftover discount also reduces shipping.
    pub apply_to_shipping: bool,

    /// Coupon gating.
    pub coupon_mode: CouponMode,

    /// How often one customer may use the rule.
    pub uses_per_customer: Option<u32>,

    /// How often the rule may be used across all customers.
    pub usage_limit: Option<u32>,

    /// Times the rule has been used, as loaded from storage.
    pub times_used: u64,

    /// Stop evaluating lower-priority rules once this one applied.
    pub stop_processing: bool,

    /// Free-shipping grant.
    pub free_shipping: FreeShippingGrant,

    /// Eligibility and item-selection predicate.
    pub conditions: Arc<dyn Conditions>,
}

impl Rule {
    /// A rule with the given action and amount that matches everything and
    /// carries no caps, gates, or grants.
    #[must_use]
    pub fn new(id: RuleId, action: ActionKind, amount: Decimal) -> Self {
        Self {
            id,
            label: None,
            action,
            amount,
            step: Decimal::ZERO,
            discount_qty: None,
            apply_to_shipping: false,
            coupon_mode: CouponMode::default(),
            uses_per_customer: None,
            usage_limit: None,
            times_used: 0,
            stop_processing: false,
            free_shipping: FreeShippingGrant::default(),
            conditions: Arc::new(MatchAll),
        }
    }
}

/// A code-gated credential granting eligibility for coupon-required rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    /// Coupon identifier.
    pub id: CouponId,

    /// The code customers enter.
    pub code: String,

    /// The rule this coupon unlocks.
    pub rule_id: RuleId,

    /// Cap on total uses across all customers.
    pub usage_limit: Option<u32>,

    /// Times the coupon has been used, as loaded from storage.
    pub times_used: u64,

    /// Cap on uses per customer.
    pub usage_per_customer: Option<u32>,
}

/// Source of the rules eligible for a cart's website, customer group, and
/// coupon code. Implementations return rules already sorted by priority.
pub trait RuleSource: fmt::Debug + Send + Sync {
    /// Rules eligible for the given selection key, in priority order.
    fn rules_for(
        &self,
        website_id: u32,
        customer_group_id: u32,
        coupon_code: Option<&str>,
    ) -> Vec<Rule>;
}

/// A fixed rule list handed out for every selection key.
#[derive(Debug, Clone, Default)]
pub struct StaticRules(pub Vec<Rule>);

impl RuleSource for StaticRules {
    fn rules_for(
        &self,
        _website_id: u32,
        _customer_group_id: u32,
        _coupon_code: Option<&str>,
    ) -> Vec<Rule> {
        self.0.clone()
    }
}
