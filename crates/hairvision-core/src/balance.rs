//! Credit balance and monthly rollover.
//!
//! A [`CreditBalance`] is the single ledger row kept per salon. Rollover is
//! applied lazily: every read and write path runs [`apply_rollover`] with the
//! current time before looking at the counters, so no background timer is
//! needed.

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::{SalonId, SubscriptionTier};

/// A salon's credit balance for the current billing cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    /// The salon this balance belongs to.
    pub salon_id: SalonId,

    /// Current subscription tier.
    pub subscription_tier: SubscriptionTier,

    /// Credits granted by the subscription for this cycle.
    pub base_credits: i64,

    /// Credits consumed this cycle.
    pub used_credits: i64,

    /// Credits bought outside the subscription.
    pub purchased_credits: i64,

    /// When the current cycle ends and counters roll over.
    pub reset_date: DateTime<Utc>,

    /// When the balance was created.
    pub created_at: DateTime<Utc>,

    /// When the balance was last updated.
    pub updated_at: DateTime<Utc>,
}

impl CreditBalance {
    /// Create the default balance for a salon seen for the first time.
    ///
    /// New salons start on the lowest tier with no usage, and their first
    /// cycle ends one billing period from `now`.
    #[must_use]
    pub fn new(salon_id: SalonId, now: DateTime<Utc>) -> Self {
        let tier = SubscriptionTier::lowest();
        Self {
            salon_id,
            subscription_tier: tier,
            base_credits: tier.monthly_credits(),
            used_credits: 0,
            purchased_credits: 0,
            reset_date: add_billing_period(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Total credits available this cycle (base plus purchased).
    #[must_use]
    pub const fn total_credits(&self) -> i64 {
        self.base_credits.saturating_add(self.purchased_credits)
    }

    /// Credits consumed beyond base and purchased credits.
    #[must_use]
    pub fn overage_credits(&self) -> i64 {
        self.used_credits
            .saturating_sub(self.total_credits())
            .max(0)
    }

    /// Check whether the cycle has ended at `now`.
    #[must_use]
    pub fn needs_rollover(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_date
    }
}

/// Advance a timestamp by one billing period (one calendar month).
///
/// Falls back to 30 days when the calendar arithmetic overflows.
#[must_use]
pub fn add_billing_period(from: DateTime<Utc>) -> DateTime<Utc> {
    period_end(from, 1)
}

/// End of the `periods`-th billing period counted from `anchor`.
///
/// Each end is computed from the anchor, so a cycle anchored on the 31st
/// returns to the 31st after a shorter month.
#[must_use]
pub fn period_end(anchor: DateTime<Utc>, periods: u32) -> DateTime<Utc> {
    anchor
        .checked_add_months(Months::new(periods))
        .unwrap_or_else(|| anchor + Duration::days(30 * i64::from(periods)))
}

/// First period end anchored on `anchor` that lies strictly after `now`.
#[must_use]
pub fn next_reset_after(anchor: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let elapsed_months = (i64::from(now.year()) - i64::from(anchor.year())) * 12
        + i64::from(now.month())
        - i64::from(anchor.month());

    // One month short of `elapsed_months` is never past `now`.
    let mut periods = u32::try_from(elapsed_months.max(1)).unwrap_or(u32::MAX);
    let mut reset = period_end(anchor, periods);
    while reset <= now && periods < u32::MAX {
        periods += 1;
        reset = period_end(anchor, periods);
    }
    reset
}

/// Roll a balance over into the current billing cycle.
///
/// If `now` is before `reset_date` the balance is returned untouched.
/// Otherwise:
///
/// - purchased credits spent during the closing cycle are deducted,
/// - `used_credits` is reset to zero,
/// - `base_credits` is reset to the tier's allotment (unused base credits do
///   not carry over),
/// - `reset_date` moves to the first period end after `now`, counted in whole
///   months from `created_at`.
///
/// Applying the function twice with the same `now` is a no-op the second time.
#[must_use]
pub fn apply_rollover(mut balance: CreditBalance, now: DateTime<Utc>) -> CreditBalance {
    if !balance.needs_rollover(now) {
        return balance;
    }

    let purchased = balance.purchased_credits.max(0);
    let consumed_purchased = balance
        .used_credits
        .saturating_sub(balance.base_credits)
        .max(0)
        .min(purchased);

    balance.purchased_credits = purchased - consumed_purchased;
    balance.used_credits = 0;
    balance.base_credits = balance.subscription_tier.monthly_credits();

    balance.reset_date = next_reset_after(balance.created_at, now);
    balance.updated_at = now;

    balance
}
