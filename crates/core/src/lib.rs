//! Marque
//!
//! Marque is a promotional discount engine for shopping carts: it selects the
//! rules applicable to a cart, decides which line items each rule touches,
//! allocates discount amounts with one of four strategies, applies shipping
//! discounts, and records which rules were used.
//!
//! The whole pipeline is synchronous and side-effect free outside the cart it
//! is handed; persistence of usage counters lives in the `marque-app` crate.

pub mod actions;
pub mod calculator;
pub mod cart;
pub mod collector;
pub mod eligibility;
pub mod filter;
pub mod fixtures;
pub mod ids;
pub mod money;
pub mod prelude;
pub mod rules;
