//! Cart-wide fixed allocation

use rust_decimal::Decimal;
use rusty_money::iso::Currency;

use crate::{
    cart::Destination,
    money,
    rules::{ActionKind, Rule},
};

use super::{ActionHandler, HandlerContext, discount_shipping, rule_qty};

/// A single fixed amount split across the whole selection.
///
/// The pool is spread proportionally to each line's share of the total
/// discountable row price, then leftover cents are swept into the first
/// lines with remaining capacity. When the rule also discounts shipping,
/// whatever the lines could not absorb goes to shipping, and anything still
/// left after that is offered to the lines once more.
///
/// The quote and base currency run as independent lanes over the same
/// selection, each with its own pool, shares, and rounding. The sum of the
/// amounts granted in a lane never exceeds that lane's pool, and no line is
/// ever granted more than it has undiscounted row amount left.
#[derive(Debug, Clone, Copy, Default)]
pub struct CartFixed;

/// One line's stake in a single-currency allocation lane.
#[derive(Debug, Clone, Copy)]
struct Stake {
    /// Discountable row price, the weight in the proportional split.
    price: Decimal,

    /// Most this line may still absorb, floored to the minor unit.
    capacity: Decimal,
}

/// Spread `pool` across the stakes proportionally to their price share,
/// bounding each grant by the stake's capacity and the pool itself.
/// Returns the grants alongside the amount left over.
fn split_proportionally(
    pool: Decimal,
    stakes: &[Stake],
    currency: &Currency,
) -> (Vec<Decimal>, Decimal) {
    let total: Decimal = stakes.iter().map(|stake| stake.price).sum();
    let mut grants = vec![Decimal::ZERO; stakes.len()];
    let mut left = pool;

    if total <= Decimal::ZERO {
        return (grants, left);
    }

    for (grant, stake) in grants.iter_mut().zip(stakes) {
        if left <= Decimal::ZERO {
            break;
        }

        let share = money::round(pool * stake.price / total, currency);

        *grant = share.min(stake.capacity).min(left).max(Decimal::ZERO);
        left -= *grant;
    }

    (grants, left)
}

/// Top up grants from `left`, in input order, until the pool is exhausted
/// or no stake has capacity to spare. Top-ups are partial: a stake takes
/// whatever fits rather than all or nothing.
fn sweep_leftover(stakes: &[Stake], grants: &mut [Decimal], left: &mut Decimal) {
    for (grant, stake) in grants.iter_mut().zip(stakes) {
        if *left <= Decimal::ZERO {
            break;
        }

        let room = (stake.capacity - *grant).min(*left).max(Decimal::ZERO);

        *grant += room;
        *left -= room;
    }
}

impl ActionHandler for CartFixed {
    fn kind(&self) -> ActionKind {
        ActionKind::CartFixed
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

        let base_pool = money::round(rule.amount, ctx.base_currency);
        let quote_pool = money::round(
            ctx.converter.convert(rule.amount, ctx.base_currency),
            ctx.quote_currency,
        );

        let mut indices = Vec::with_capacity(selected.len());
        let mut quote_stakes = Vec::with_capacity(selected.len());
        let mut base_stakes = Vec::with_capacity(selected.len());

        for &index in selected {
            let Some(item) = destination.items.get(index) else {
                continue;
            };

            let qty = rule_qty(rule, item);

            if qty <= Decimal::ZERO {
                continue;
            }

            let price = item.price * qty;
            let base_price = item.base_price * qty;

            indices.push(index);

            quote_stakes.push(Stake {
                price,
                capacity: money::round_down(
                    price
                        .min(item.row_total() - item.discount_amount)
                        .max(Decimal::ZERO),
                    ctx.quote_currency,
                ),
            });

            base_stakes.push(Stake {
                price: base_price,
                capacity: money::round_down(
                    base_price
                        .min(item.base_row_total() - item.base_discount_amount)
                        .max(Decimal::ZERO),
                    ctx.base_currency,
                ),
            });
        }

        let (mut quote_grants, mut left) =
            split_proportionally(quote_pool, &quote_stakes, ctx.quote_currency);
        let (mut base_grants, mut base_left) =
            split_proportionally(base_pool, &base_stakes, ctx.base_currency);

        sweep_leftover(&quote_stakes, &mut quote_grants, &mut left);
        sweep_leftover(&base_stakes, &mut base_grants, &mut base_left);

        let mut applied = false;

        if rule.apply_to_shipping && (left > Decimal::ZERO || base_left > Decimal::ZERO) {
            let (granted, base_granted) = discount_shipping(destination, left, base_left);

            left -= granted;
            base_left -= base_granted;
            applied |= granted > Decimal::ZERO || base_granted > Decimal::ZERO;

            sweep_leftover(&quote_stakes, &mut quote_grants, &mut left);
            sweep_leftover(&base_stakes, &mut base_grants, &mut base_left);
        }

        for ((&index, grant), base_grant) in indices.iter().zip(&quote_grants).zip(&base_grants) {
            if *grant <= Decimal::ZERO && *base_grant <= Decimal::ZERO {
                continue;
            }

            let Some(item) = destination.items.get_mut(index) else {
                continue;
            };

            item.discount_amount += *grant;
            item.base_discount_amount += *base_grant;
            item.original_discount_amount += *grant;
            item.base_original_discount_amount += *base_grant;

            applied = true;
        }

        applied
    }
}
