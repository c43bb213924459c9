//! Usage counters repository
//!
//! Every counter write is a single-statement atomic upsert, so concurrent
//! order placements for the same rule, coupon, or customer never lose an
//! increment.

use marque::{
    cart::CustomerId,
    rules::{CouponId, RuleId},
};
use sqlx::{PgPool, Postgres, Transaction, query, query_as, query_scalar};

use crate::usage::records::{CouponRecord, NewCoupon};

const CREATE_COUPON_SQL: &str = include_str!("sql/create_coupon.sql");
const GET_COUPON_BY_CODE_SQL: &str = include_str!("sql/get_coupon_by_code.sql");
const INCREMENT_RULE_USAGE_SQL: &str = include_str!("sql/increment_rule_usage.sql");
const INCREMENT_RULE_CUSTOMER_USAGE_SQL: &str =
    include_str!("sql/increment_rule_customer_usage.sql");
const INCREMENT_COUPON_USAGE_SQL: &str = include_str!("sql/increment_coupon_usage.sql");
const INCREMENT_COUPON_CUSTOMER_USAGE_SQL: &str =
    include_str!("sql/increment_coupon_customer_usage.sql");
const GET_RULE_USAGE_SQL: &str = include_str!("sql/get_rule_usage.sql");
const GET_RULE_CUSTOMER_USAGE_SQL: &str = include_str!("sql/get_rule_customer_usage.sql");
const GET_COUPON_CUSTOMER_USAGE_SQL: &str = include_str!("sql/get_coupon_customer_usage.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgUsageRepository;

impl PgUsageRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: NewCoupon,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_COUPON_SQL)
            .bind(coupon.id.into_uuid())
            .bind(&coupon.code)
            .bind(coupon.rule_id.into_uuid())
            .bind(coupon.usage_limit.map(i64::from))
            .bind(coupon.usage_per_customer.map(i64::from))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn get_coupon_by_code(
        &self,
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<CouponRecord>, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(GET_COUPON_BY_CODE_SQL)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    pub(crate) async fn get_coupon_by_code_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<CouponRecord>, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(GET_COUPON_BY_CODE_SQL)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn increment_rule_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rule: RuleId,
    ) -> Result<(), sqlx::Error> {
        query(INCREMENT_RULE_USAGE_SQL)
            .bind(rule.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn increment_rule_customer_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rule: RuleId,
        customer: CustomerId,
    ) -> Result<(), sqlx::Error> {
        query(INCREMENT_RULE_CUSTOMER_USAGE_SQL)
            .bind(rule.into_uuid())
            .bind(customer.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn increment_coupon_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponId,
    ) -> Result<(), sqlx::Error> {
        query(INCREMENT_COUPON_USAGE_SQL)
            .bind(coupon.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn increment_coupon_customer_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponId,
        customer: CustomerId,
    ) -> Result<(), sqlx::Error> {
        query(INCREMENT_COUPON_CUSTOMER_USAGE_SQL)
            .bind(coupon.into_uuid())
            .bind(customer.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn rule_usage_total(
        &self,
        pool: &PgPool,
        rule: RuleId,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = query_scalar(GET_RULE_USAGE_SQL)
            .bind(rule.into_uuid())
            .fetch_optional(pool)
            .await?;

        Ok(count.unwrap_or(0))
    }

    pub(crate) async fn rule_customer_usage(
        &self,
        pool: &PgPool,
        rule: RuleId,
        customer: CustomerId,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = query_scalar(GET_RULE_CUSTOMER_USAGE_SQL)
            .bind(rule.into_uuid())
            .bind(customer.into_uuid())
            .fetch_optional(pool)
            .await?;

        Ok(count.unwrap_or(0))
    }

    pub(crate) async fn coupon_customer_usage(
        &self,
        pool: &PgPool,
        coupon: CouponId,
        customer: CustomerId,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = query_scalar(GET_COUPON_CUSTOMER_USAGE_SQL)
            .bind(coupon.into_uuid())
            .bind(customer.into_uuid())
            .fetch_optional(pool)
            .await?;

        Ok(count.unwrap_or(0))
    }
}
