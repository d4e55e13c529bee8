//! The credit ledger.
//!
//! [`CreditLedger`] owns every read-modify-write on a salon's balance. Each
//! operation takes the salon's async mutex, loads the balance (creating it on
//! first sight), applies any pending rollover, mutates, persists and, for
//! usage, appends the history record in the same store write before
//! releasing the lock. Different
//! salons never contend.
//!
//! Locks are process-local. Running several service instances against one
//! database does not serialize updates across them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use hairvision_core::{
    apply_rollover, CreditBalance, CreditUsageRecord, Resolution, SalonId, SubscriptionTier,
};
use hairvision_store::{Store, StoreError};

/// Largest page of usage history returned by one call.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Errors returned by the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The caller passed a value the ledger refuses.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The store failed. Never retried here.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A usage report to charge against a salon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageReport {
    /// Credits consumed. Must be positive.
    pub credits_used: i64,
    /// Model that served the work.
    pub model: String,
    /// Output resolution.
    pub resolution: Resolution,
    /// Upstream cost in cents. Must not be negative.
    pub cost_cents: i64,
}

/// Per-salon credit ledger over a [`Store`].
pub struct CreditLedger {
    store: Arc<dyn Store>,
    locks: DashMap<SalonId, Arc<Mutex<()>>>,
}

impl CreditLedger {
    /// Create a ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, salon_id: &SalonId) -> Arc<Mutex<()>> {
        self.locks.entry(salon_id.clone()).or_default().clone()
    }

    /// Load the balance, creating or rolling it over as needed.
    ///
    /// Must be called with the salon's lock held.
    async fn load(&self, salon_id: &SalonId, now: DateTime<Utc>) -> LedgerResult<CreditBalance> {
        let Some(stored) = self.store.get_balance(salon_id).await? else {
            let balance = CreditBalance::new(salon_id.clone(), now);
            self.store.put_balance(&balance).await?;
            tracing::info!(
                salon_id = %salon_id,
                tier = %balance.subscription_tier,
                reset_date = %balance.reset_date,
                "Created credit balance"
            );
            return Ok(balance);
        };

        if !stored.needs_rollover(now) {
            return Ok(stored);
        }

        let previous_reset = stored.reset_date;
        let balance = apply_rollover(stored, now);
        self.store.put_balance(&balance).await?;
        tracing::info!(
            salon_id = %salon_id,
            previous_reset = %previous_reset,
            reset_date = %balance.reset_date,
            purchased_credits = balance.purchased_credits,
            "Rolled over credit balance"
        );

        Ok(balance)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a salon's balance, creating a default one on first access.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Store` if the store fails.
    pub async fn get_balance(&self, salon_id: &SalonId) -> LedgerResult<CreditBalance> {
        self.get_balance_at(salon_id, Utc::now()).await
    }

    /// [`get_balance`](Self::get_balance) at an explicit time.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Store` if the store fails.
    pub async fn get_balance_at(
        &self,
        salon_id: &SalonId,
        now: DateTime<Utc>,
    ) -> LedgerResult<CreditBalance> {
        let lock = self.lock_for(salon_id);
        let _guard = lock.lock().await;
        self.load(salon_id, now).await
    }

    /// List a salon's usage history, newest first.
    ///
    /// `limit` is capped at [`MAX_HISTORY_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Store` if the store fails.
    pub async fn usage_history(
        &self,
        salon_id: &SalonId,
        limit: usize,
        offset: usize,
    ) -> LedgerResult<Vec<CreditUsageRecord>> {
        let limit = limit.min(MAX_HISTORY_LIMIT);
        Ok(self.store.list_usage(salon_id, limit, offset).await?)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Charge usage against a salon and append it to the history.
    ///
    /// Overage is allowed: usage past the salon's total is recorded like any
    /// other usage.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidArgument` if `credits_used <= 0`, `cost_cents < 0`,
    ///   or the charge would overflow the used credit counter.
    /// - `LedgerError::Store` if the store fails. Neither the balance nor the
    ///   history is changed in that case.
    pub async fn record_usage(
        &self,
        salon_id: &SalonId,
        report: UsageReport,
    ) -> LedgerResult<CreditBalance> {
        self.record_usage_at(salon_id, report, Utc::now()).await
    }

    /// [`record_usage`](Self::record_usage) at an explicit time.
    ///
    /// # Errors
    ///
    /// See [`record_usage`](Self::record_usage).
    pub async fn record_usage_at(
        &self,
        salon_id: &SalonId,
        report: UsageReport,
        now: DateTime<Utc>,
    ) -> LedgerResult<CreditBalance> {
        if report.credits_used <= 0 {
            return Err(LedgerError::InvalidArgument(format!(
                "credits_used must be positive, got {}",
                report.credits_used
            )));
        }
        if report.cost_cents < 0 {
            return Err(LedgerError::InvalidArgument(format!(
                "cost_cents must not be negative, got {}",
                report.cost_cents
            )));
        }

        let lock = self.lock_for(salon_id);
        let _guard = lock.lock().await;

        let mut balance = self.load(salon_id, now).await?;
        let was_overage = balance.overage_credits() > 0;

        balance.used_credits = balance
            .used_credits
            .checked_add(report.credits_used)
            .ok_or_else(|| {
                LedgerError::InvalidArgument(format!(
                    "credits_used {} would overflow the used credit counter",
                    report.credits_used
                ))
            })?;
        balance.updated_at = now;

        let record = CreditUsageRecord::new(
            salon_id.clone(),
            report.credits_used,
            report.model,
            report.resolution,
            report.cost_cents,
            now,
        );
        self.store.record_usage(&balance, &record).await?;

        tracing::debug!(
            salon_id = %salon_id,
            record_id = %record.id,
            credits_used = record.credits_used,
            used_credits = balance.used_credits,
            model = %record.model,
            "Recorded credit usage"
        );

        let overage = balance.overage_credits();
        if overage > 0 && !was_overage {
            tracing::warn!(
                salon_id = %salon_id,
                overage_credits = overage,
                "Salon entered overage"
            );
        }

        Ok(balance)
    }

    /// Add purchased credits to a salon.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidArgument` if `amount <= 0` or the purchase would
    ///   overflow the purchased credit counter.
    /// - `LedgerError::Store` if the store fails.
    pub async fn purchase_credits(
        &self,
        salon_id: &SalonId,
        amount: i64,
    ) -> LedgerResult<CreditBalance> {
        self.purchase_credits_at(salon_id, amount, Utc::now()).await
    }

    /// [`purchase_credits`](Self::purchase_credits) at an explicit time.
    ///
    /// # Errors
    ///
    /// See [`purchase_credits`](Self::purchase_credits).
    pub async fn purchase_credits_at(
        &self,
        salon_id: &SalonId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> LedgerResult<CreditBalance> {
        if amount <= 0 {
            return Err(LedgerError::InvalidArgument(format!(
                "purchase amount must be positive, got {amount}"
            )));
        }

        let lock = self.lock_for(salon_id);
        let _guard = lock.lock().await;

        let mut balance = self.load(salon_id, now).await?;
        balance.purchased_credits = balance
            .purchased_credits
            .checked_add(amount)
            .ok_or_else(|| {
                LedgerError::InvalidArgument(format!(
                    "purchase of {amount} would overflow the purchased credit counter"
                ))
            })?;
        balance.updated_at = now;
        self.store.put_balance(&balance).await?;

        tracing::info!(
            salon_id = %salon_id,
            amount = amount,
            purchased_credits = balance.purchased_credits,
            "Purchased credits"
        );

        Ok(balance)
    }

    /// Move a salon to another tier.
    ///
    /// The tier name is case-insensitive. `base_credits` is reset to the new
    /// tier's allotment immediately; usage and the reset date are kept.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidArgument` if `tier` is not a known tier. The
    ///   balance is left untouched.
    /// - `LedgerError::Store` if the store fails.
    pub async fn update_subscription(
        &self,
        salon_id: &SalonId,
        tier: &str,
    ) -> LedgerResult<CreditBalance> {
        self.update_subscription_at(salon_id, tier, Utc::now()).await
    }

    /// [`update_subscription`](Self::update_subscription) at an explicit time.
    ///
    /// # Errors
    ///
    /// See [`update_subscription`](Self::update_subscription).
    pub async fn update_subscription_at(
        &self,
        salon_id: &SalonId,
        tier: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<CreditBalance> {
        let tier: SubscriptionTier = tier
            .parse()
            .map_err(|e: hairvision_core::CoreError| LedgerError::InvalidArgument(e.to_string()))?;

        let lock = self.lock_for(salon_id);
        let _guard = lock.lock().await;

        let mut balance = self.load(salon_id, now).await?;
        let previous = balance.subscription_tier;

        balance.subscription_tier = tier;
        balance.base_credits = tier.monthly_credits();
        balance.updated_at = now;
        self.store.put_balance(&balance).await?;

        tracing::info!(
            salon_id = %salon_id,
            from = %previous,
            to = %tier,
            base_credits = balance.base_credits,
            "Updated subscription tier"
        );

        Ok(balance)
    }
}
