//! Persistence for promotional rule and coupon usage counters.
//!
//! The calculation engine in `marque` is pure; the usage counters recorded
//! at order placement are the one piece of state it relies on. This crate
//! owns those counters in PostgreSQL, increments them atomically under
//! concurrent order placement, and bridges the persisted counts back into
//! the engine's synchronous lookup traits.

pub mod database;
pub mod usage;

#[cfg(test)]
mod test;
