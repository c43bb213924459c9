//! Usage counters
//!
//! Rule and coupon consumption recorded at order placement, plus the read
//! side the eligibility checks consume.

pub mod errors;
pub mod records;
pub mod service;
pub mod snapshot;

mod repository;

pub use errors::UsageServiceError;
pub use records::{NewCoupon, OrderUsage};
pub use service::{PgUsageService, UsageService};
pub use snapshot::UsageSnapshot;
