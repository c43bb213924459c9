//! Carts, destinations, and line items
//!
//! These types are the mutable working set of one discount-calculation pass.
//! The engine owns and mutates them in place for the duration of a pass and
//! never persists them; loading and saving the cart graph is the caller's
//! concern.

use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};

use crate::{ids::TypedUuid, rules::RuleId};

/// The set of rule identifiers recorded on a cart, destination, or line.
pub type RuleIdSet = FxHashSet<RuleId>;

/// Marker for customer identity. Customers themselves live outside the
/// engine; only their identifier is consulted for usage caps.
#[derive(Debug, Clone, Copy)]
pub struct Customer;

/// Identifier of the customer owning a cart.
pub type CustomerId = TypedUuid<Customer>;

/// Identifier of a cart line item.
pub type ItemId = TypedUuid<LineItem>;

/// Free-shipping entitlement carried by a line item.
///
/// Rules may grant free shipping for a capped quantity only, in which case
/// the item is fully covered just when the cap reaches its quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeShipping {
    /// No entitlement.
    #[default]
    No,

    /// The whole line ships free.
    Yes,

    /// Free shipping for up to this many units.
    UpToQty(Decimal),
}

impl FreeShipping {
    /// Whether the entitlement covers a line of `qty` units completely.
    #[must_use]
    pub fn covers(&self, qty: Decimal) -> bool {
        match self {
            Self::No => false,
            Self::Yes => true,
            Self::UpToQty(cap) => *cap >= qty,
        }
    }
}

/// One product line within a destination.
///
/// The four unit prices and four discount accumulators come in parallel
/// quote/base and current/original variants so later pricing stages (tax in
/// particular) can reconstruct both post- and pre-other-discount prices.
#[derive(Debug, Clone)]
pub struct LineItem {
    /// Line identifier, unique within the cart.
    pub id: ItemId,

    /// Parent line for composite products.
    pub parent_id: Option<ItemId>,

    /// Whether this line has composite children.
    pub has_children: bool,

    /// Whether the composite's cost is carried by its children. On a child
    /// line this mirrors the parent's flag.
    pub children_calculated: bool,

    /// Product identifier used by rule conditions.
    pub sku: String,

    /// Units on this line.
    pub qty: Decimal,

    /// Unit price in the quote currency.
    pub price: Decimal,

    /// Unit price in the base currency.
    pub base_price: Decimal,

    /// Pre-discount unit price in the quote currency.
    pub original_price: Decimal,

    /// Pre-discount unit price in the base currency.
    pub base_original_price: Decimal,

    /// Accumulated discount in the quote currency.
    pub discount_amount: Decimal,

    /// Accumulated discount in the base currency.
    pub base_discount_amount: Decimal,

    /// Accumulated discount against the original price, quote currency.
    pub original_discount_amount: Decimal,

    /// Accumulated discount against the original price, base currency.
    pub base_original_discount_amount: Decimal,

    /// Running percentage discount, capped at 100.
    pub discount_percent: Decimal,

    /// Free-shipping entitlement granted by rules.
    pub free_shipping: FreeShipping,

    /// Lines flagged here never receive discounts.
    pub no_discount: bool,

    /// Rules that contributed discounts to this line.
    pub applied_rule_ids: RuleIdSet,
}

impl LineItem {
    /// Row total at the current unit price.
    #[must_use]
    pub fn row_total(&self) -> Decimal {
        self.price * self.qty
    }

    /// Row total at the current base-currency unit price.
    #[must_use]
    pub fn base_row_total(&self) -> Decimal {
        self.base_price * self.qty
    }

    /// Row total at the original unit price.
    #[must_use]
    pub fn original_row_total(&self) -> Decimal {
        self.original_price * self.qty
    }

    /// Row total at the original base-currency unit price.
    #[must_use]
    pub fn base_original_row_total(&self) -> Decimal {
        self.base_original_price * self.qty
    }
}

/// A shipping or billing grouping of a cart's items, carrying its own
/// discount and shipping totals.
#[derive(Debug, Clone, Default)]
pub struct Destination {
    /// Lines belonging to this destination.
    pub items: Vec<LineItem>,

    /// Undiscounted subtotal in the quote currency.
    pub subtotal: Decimal,

    /// Undiscounted subtotal in the base currency.
    pub base_subtotal: Decimal,

    /// Shipping charge in the quote currency.
    pub shipping_amount: Decimal,

    /// Shipping charge in the base currency.
    pub base_shipping_amount: Decimal,

    /// Override of the shipping amount open to discounting, if the carrier
    /// charge and the discountable charge differ.
    pub shipping_amount_for_discount: Option<Decimal>,

    /// Base-currency counterpart of the discountable-shipping override.
    pub base_shipping_amount_for_discount: Option<Decimal>,

    /// Running discount total in the quote currency.
    pub discount_amount: Decimal,

    /// Running discount total in the base currency.
    pub base_discount_amount: Decimal,

    /// Subtotal after discounts, quote currency.
    pub subtotal_with_discount: Decimal,

    /// Subtotal after discounts, base currency.
    pub base_subtotal_with_discount: Decimal,

    /// Accumulated shipping discount in the quote currency.
    pub shipping_discount_amount: Decimal,

    /// Accumulated shipping discount in the base currency.
    pub base_shipping_discount_amount: Decimal,

    /// Whether the whole destination ships free.
    pub free_shipping: bool,

    /// Coupon code recorded when a coupon-gated rule applied.
    pub coupon_code: Option<String>,

    /// Rules applied to this destination.
    pub applied_rule_ids: RuleIdSet,

    /// One display label per applied rule, in application order.
    pub descriptions: Vec<(RuleId, String)>,

    /// Joined description text derived from [`Self::descriptions`].
    pub discount_description: String,
}

impl Destination {
    /// Shipping amount still open to discounting, per currency.
    ///
    /// Uses the discountable-shipping overrides when both are present, the
    /// plain shipping charges otherwise, minus discounts already granted.
    #[must_use]
    pub fn remaining_shipping(&self) -> (Decimal, Decimal) {
        let (shipping, base_shipping) = match (
            self.shipping_amount_for_discount,
            self.base_shipping_amount_for_discount,
        ) {
            (Some(shipping), Some(base_shipping)) => (shipping, base_shipping),
            _ => (self.shipping_amount, self.base_shipping_amount),
        };

        (
            shipping - self.shipping_discount_amount,
            base_shipping - self.base_shipping_discount_amount,
        )
    }
}

/// The collection of line items and destinations being priced.
#[derive(Debug, Clone)]
pub struct Cart {
    /// Website scoping the applicable rule set.
    pub website_id: u32,

    /// Customer group scoping the applicable rule set.
    pub customer_group_id: u32,

    /// Currency the customer sees.
    pub quote_currency: &'static Currency,

    /// Currency the store accounts in.
    pub base_currency: &'static Currency,

    /// Owning customer, when logged in.
    pub customer_id: Option<CustomerId>,

    /// Coupon code attached to the cart, if any.
    pub coupon_code: Option<String>,

    /// Rules applied anywhere on the cart. Grows only within one pass.
    pub applied_rule_ids: RuleIdSet,

    /// Shipping and billing groupings.
    pub destinations: Vec<Destination>,
}

impl Cart {
    /// Coupon code trimmed to its significant characters, if non-empty.
    #[must_use]
    pub fn trimmed_coupon_code(&self) -> Option<&str> {
        self.coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}
