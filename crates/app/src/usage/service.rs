//! Usage service.

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashSet;
use tracing::info;

use marque::{cart::CustomerId, rules::RuleId};

use crate::{
    database::Db,
    usage::{
        errors::UsageServiceError,
        records::{NewCoupon, OrderUsage},
        repository::PgUsageRepository,
        snapshot::UsageSnapshot,
    },
};

#[derive(Debug, Clone)]
pub struct PgUsageService {
    db: Db,
    repository: PgUsageRepository,
}

impl PgUsageService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgUsageRepository::new(),
        }
    }
}

#[async_trait]
impl UsageService for PgUsageService {
    #[tracing::instrument(
        name = "usage.service.create_coupon",
        skip(self, coupon),
        fields(coupon_code = %coupon.code, rule_id = %coupon.rule_id),
        err
    )]
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<(), UsageServiceError> {
        let mut tx = self.db.begin().await?;

        self.repository.create_coupon(&mut tx, coupon).await?;

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "usage.service.record_order_usage",
        skip(self, order),
        fields(
            rule_count = order.applied_rule_ids.len(),
            has_customer = order.customer_id.is_some(),
            has_coupon = order.coupon_code.is_some()
        ),
        err
    )]
    async fn record_order_usage(&self, order: OrderUsage) -> Result<(), UsageServiceError> {
        let mut tx = self.db.begin().await?;

        let mut seen = FxHashSet::default();

        for rule_id in order.applied_rule_ids.iter().copied() {
            if !seen.insert(rule_id) {
                continue;
            }

            self.repository.increment_rule_usage(&mut tx, rule_id).await?;

            if let Some(customer) = order.customer_id {
                self.repository
                    .increment_rule_customer_usage(&mut tx, rule_id, customer)
                    .await?;
            }
        }

        if let Some(code) = order.coupon_code.as_deref()
            && let Some(coupon) = self.repository.get_coupon_by_code_tx(&mut tx, code).await?
        {
            self.repository
                .increment_coupon_usage(&mut tx, coupon.id)
                .await?;

            if let Some(customer) = order.customer_id {
                self.repository
                    .increment_coupon_customer_usage(&mut tx, coupon.id, customer)
                    .await?;
            }
        }

        tx.commit().await?;

        info!(rules = seen.len(), "recorded order usage");

        Ok(())
    }

    #[tracing::instrument(
        name = "usage.service.load_usage_snapshot",
        skip(self, rule_ids),
        fields(rule_count = rule_ids.len(), has_coupon = coupon_code.is_some()),
        err
    )]
    async fn load_usage_snapshot(
        &self,
        customer: Option<CustomerId>,
        coupon_code: Option<String>,
        rule_ids: Vec<RuleId>,
    ) -> Result<UsageSnapshot, UsageServiceError> {
        let mut snapshot = UsageSnapshot::default();

        if let Some(code) = coupon_code.as_deref()
            && let Some(record) = self
                .repository
                .get_coupon_by_code(self.db.pool(), code)
                .await?
        {
            if let Some(customer) = customer {
                let count = self
                    .repository
                    .coupon_customer_usage(self.db.pool(), record.id, customer)
                    .await?;

                snapshot.set_coupon_count(customer, record.id, u64::try_from(count).unwrap_or(0));
            }

            snapshot.set_coupon(record.into());
        }

        if let Some(customer) = customer {
            let mut seen = FxHashSet::default();

            for rule_id in rule_ids.iter().copied() {
                if !seen.insert(rule_id) {
                    continue;
                }

                let count = self
                    .repository
                    .rule_customer_usage(self.db.pool(), rule_id, customer)
                    .await?;

                snapshot.set_rule_count(customer, rule_id, u64::try_from(count).unwrap_or(0));
            }
        }

        Ok(snapshot)
    }

    #[tracing::instrument(
        name = "usage.service.rule_times_used",
        skip(self),
        fields(rule_id = %rule),
        err
    )]
    async fn rule_times_used(&self, rule: RuleId) -> Result<u64, UsageServiceError> {
        let count = self
            .repository
            .rule_usage_total(self.db.pool(), rule)
            .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[automock]
#[async_trait]
pub trait UsageService: Send + Sync {
    /// Register a coupon row.
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<(), UsageServiceError>;

    /// Record one placed order's rule and coupon usage, atomically.
    async fn record_order_usage(&self, order: OrderUsage) -> Result<(), UsageServiceError>;

    /// Freeze the counts relevant to one cart into an in-memory snapshot.
    async fn load_usage_snapshot(
        &self,
        customer: Option<CustomerId>,
        coupon_code: Option<String>,
        rule_ids: Vec<RuleId>,
    ) -> Result<UsageSnapshot, UsageServiceError>;

    /// Times `rule` has been used across all customers.
    async fn rule_times_used(&self, rule: RuleId) -> Result<u64, UsageServiceError>;
}
