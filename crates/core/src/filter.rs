//! Item selection
//!
//! Narrows a destination's lines to the subset a rule's action conditions
//! select. Composite products are counted exactly once: when a composite's
//! cost is carried by its children, the parent line is skipped; until then,
//! the children are.

use smallvec::SmallVec;

use crate::{cart::LineItem, rules::Rule};

/// Indices into `items` a rule may discount, in input order.
#[must_use]
pub fn select_items(rule: &Rule, items: &[LineItem]) -> SmallVec<[usize; 8]> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            if item.no_discount {
                return false;
            }

            if item.parent_id.is_some() && !item.children_calculated {
                return false;
            }

            if item.has_children && item.children_calculated {
                return false;
            }

            rule.conditions.matches_item(item)
        })
        .map(|(index, _)| index)
        .collect()
}
