//! Fixtures
//!
//! Ready-made carts, line items, and condition predicates for exercising the
//! engine in tests and examples.

use rust_decimal::Decimal;
use rusty_money::iso::USD;

use crate::{
    cart::{Cart, Destination, FreeShipping, ItemId, LineItem},
    rules::Conditions,
};

/// A single-destination cart quoting and accounting in US dollars.
#[must_use]
pub fn cart(destination: Destination) -> Cart {
    Cart {
        website_id: 1,
        customer_group_id: 1,
        quote_currency: USD,
        base_currency: USD,
        customer_id: None,
        coupon_code: None,
        applied_rule_ids: crate::cart::RuleIdSet::default(),
        destinations: vec![destination],
    }
}

/// A plain line item with identical unit prices across all four price fields
/// and no discounts recorded yet.
#[must_use]
pub fn line_item(sku: &str, price: Decimal, qty: Decimal) -> LineItem {
    LineItem {
        id: ItemId::new(),
        parent_id: None,
        has_children: false,
        children_calculated: false,
        sku: sku.to_string(),
        qty,
        price,
        base_price: price,
        original_price: price,
        base_original_price: price,
        discount_amount: Decimal::ZERO,
        base_discount_amount: Decimal::ZERO,
        original_discount_amount: Decimal::ZERO,
        base_original_discount_amount: Decimal::ZERO,
        discount_percent: Decimal::ZERO,
        free_shipping: FreeShipping::No,
        no_discount: false,
        applied_rule_ids: crate::cart::RuleIdSet::default(),
    }
}

/// A destination owning `items`, with subtotals derived from their rows.
#[must_use]
pub fn destination(items: Vec<LineItem>) -> Destination {
    let subtotal: Decimal = items.iter().map(LineItem::row_total).sum();
    let base_subtotal: Decimal = items.iter().map(LineItem::base_row_total).sum();

    Destination {
        items,
        subtotal,
        base_subtotal,
        ..Destination::default()
    }
}

/// Conditions that match no destination and no item.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchNone;

impl Conditions for MatchNone {
    fn matches_destination(&self, _cart: &Cart, _destination: &Destination) -> bool {
        false
    }

    fn matches_item(&self, _item: &LineItem) -> bool {
        false
    }
}

/// Conditions selecting only items whose SKU appears in the list. Matches
/// every destination.
#[derive(Debug, Clone, Default)]
pub struct SkuIn(pub Vec<String>);

impl Conditions for SkuIn {
    fn matches_destination(&self, _cart: &Cart, _destination: &Destination) -> bool {
        true
    }

    fn matches_item(&self, item: &LineItem) -> bool {
        self.0.iter().any(|sku| *sku == item.sku)
    }
}
