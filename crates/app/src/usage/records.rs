//! Usage records.

use marque::{
    cart::CustomerId,
    rules::{Coupon, CouponId, RuleId},
};
use sqlx::{FromRow, Row, postgres::PgRow};
use uuid::Uuid;

/// A coupon row to register.
#[derive(Debug, Clone)]
pub struct NewCoupon {
    /// Coupon identifier.
    pub id: CouponId,

    /// The code customers enter.
    pub code: String,

    /// The rule this coupon unlocks.
    pub rule_id: RuleId,

    /// Cap on total uses across all customers.
    pub usage_limit: Option<u32>,

    /// Cap on uses per customer.
    pub usage_per_customer: Option<u32>,
}

/// The usage one placed order contributes to the counters.
#[derive(Debug, Clone, Default)]
pub struct OrderUsage {
    /// Rules recorded on the order. Duplicates count once.
    pub applied_rule_ids: Vec<RuleId>,

    /// The ordering customer, when identified.
    pub customer_id: Option<CustomerId>,

    /// Coupon code the order was placed with, if any. Codes matching no
    /// coupon row are skipped.
    pub coupon_code: Option<String>,
}

/// One persisted coupon row.
#[derive(Debug, Clone)]
pub struct CouponRecord {
    /// Coupon identifier.
    pub id: CouponId,

    /// The code customers enter.
    pub code: String,

    /// The rule this coupon unlocks.
    pub rule_id: RuleId,

    /// Cap on total uses across all customers.
    pub usage_limit: Option<i64>,

    /// Times the coupon has been used.
    pub times_used: i64,

    /// Cap on uses per customer.
    pub usage_per_customer: Option<i64>,
}

impl<'r> FromRow<'r, PgRow> for CouponRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: CouponId::from_uuid(row.try_get::<Uuid, _>("id")?),
            code: row.try_get("code")?,
            rule_id: RuleId::from_uuid(row.try_get::<Uuid, _>("rule_id")?),
            usage_limit: row.try_get("usage_limit")?,
            times_used: row.try_get("times_used")?,
            usage_per_customer: row.try_get("usage_per_customer")?,
        })
    }
}

impl From<CouponRecord> for Coupon {
    fn from(record: CouponRecord) -> Self {
        Self {
            id: record.id,
            code: record.code,
            rule_id: record.rule_id,
            usage_limit: record.usage_limit.and_then(|limit| u32::try_from(limit).ok()),
            times_used: u64::try_from(record.times_used).unwrap_or(0),
            usage_per_customer: record
                .usage_per_customer
                .and_then(|limit| u32::try_from(limit).ok()),
        }
    }
}
