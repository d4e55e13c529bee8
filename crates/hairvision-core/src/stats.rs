//! Derived credit statistics and alerts.
//!
//! Everything here is computed from a [`CreditBalance`] on read and never
//! stored, so it cannot drift from the ledger row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CreditBalance;

/// Usage percentage at which a low-credit alert is raised.
pub const LOW_CREDIT_THRESHOLD_PERCENT: f64 = 80.0;

const SECONDS_PER_DAY: i64 = 86_400;

/// Statistics derived from a credit balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditStats {
    /// Base plus purchased credits.
    pub total: i64,
    /// Credits used this cycle.
    pub used: i64,
    /// Credits left before overage (never negative).
    pub available: i64,
    /// Credits used beyond the total.
    pub overage: i64,
    /// Price of the overage at the tier's rate, in cents.
    pub overage_cost_cents: i64,
    /// Percentage of the total used, rounded to one decimal.
    pub usage_percent: f64,
    /// Whole days left until rollover, rounded up.
    pub remaining_days: i64,
    /// Whether the salon is currently in overage.
    pub is_overage: bool,
}

impl CreditStats {
    /// Compute statistics for `balance` as of `now`.
    ///
    /// The caller is expected to have applied rollover for `now` already.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(balance: &CreditBalance, now: DateTime<Utc>) -> Self {
        let total = balance.total_credits();
        let used = balance.used_credits;
        let overage = balance.overage_credits();

        let usage_percent = if total > 0 {
            ((used as f64 / total as f64) * 1000.0).round() / 10.0
        } else if used > 0 {
            100.0
        } else {
            0.0
        };

        let remaining_secs = (balance.reset_date - now).num_seconds().max(0);
        let remaining_days = (remaining_secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;

        Self {
            total,
            used,
            available: total.saturating_sub(used).max(0),
            overage,
            overage_cost_cents: overage
                .saturating_mul(balance.subscription_tier.overage_price_cents()),
            usage_percent,
            remaining_days,
            is_overage: overage > 0,
        }
    }

    /// Alerts that apply to these statistics, most severe first.
    #[must_use]
    pub fn alerts(&self) -> Vec<CreditAlert> {
        let mut alerts = Vec::new();

        if self.is_overage {
            alerts.push(CreditAlert {
                kind: AlertKind::Overage,
                severity: AlertSeverity::Critical,
                message: format!(
                    "{} credits used beyond the plan; overage charges of ${}.{:02} apply",
                    self.overage,
                    self.overage_cost_cents / 100,
                    self.overage_cost_cents % 100
                ),
            });
        } else if self.available == 0 && self.used > 0 {
            alerts.push(CreditAlert {
                kind: AlertKind::Depleted,
                severity: AlertSeverity::Critical,
                message: "All credits for this cycle have been used".to_string(),
            });
        }

        if self.usage_percent >= LOW_CREDIT_THRESHOLD_PERCENT && self.available > 0 {
            alerts.push(CreditAlert {
                kind: AlertKind::LowCredits,
                severity: AlertSeverity::Warning,
                message: format!(
                    "{} of {} credits remaining ({} days until reset)",
                    self.available, self.total, self.remaining_days
                ),
            });
        }

        alerts
    }
}

/// A credit alert surfaced to the salon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAlert {
    /// What triggered the alert.
    pub kind: AlertKind,
    /// How urgent it is.
    pub severity: AlertSeverity,
    /// Human-readable description.
    pub message: String,
}

/// Alert trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Usage crossed [`LOW_CREDIT_THRESHOLD_PERCENT`].
    LowCredits,
    /// No credits left, not yet in overage.
    Depleted,
    /// Usage beyond base and purchased credits.
    Overage,
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Worth a heads-up.
    Warning,
    /// Needs action.
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SalonId, SubscriptionTier};
    use chrono::{Duration, TimeZone};

    fn balance(used: i64, purchased: i64) -> (CreditBalance, DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let salon: SalonId = "salon-1".parse().unwrap();
        let mut balance = CreditBalance::new(salon, now);
        balance.used_credits = used;
        balance.purchased_credits = purchased;
        (balance, now)
    }

    #[test]
    fn stats_within_allotment() {
        let (balance, now) = balance(25, 0);
        let stats = CreditStats::compute(&balance, now);

        assert_eq!(stats.total, 100);
        assert_eq!(stats.used, 25);
        assert_eq!(stats.available, 75);
        assert_eq!(stats.overage, 0);
        assert_eq!(stats.overage_cost_cents, 0);
        assert!((stats.usage_percent - 25.0).abs() < f64::EPSILON);
        assert_eq!(stats.remaining_days, 31);
        assert!(!stats.is_overage);
        assert!(stats.alerts().is_empty());
    }

    #[test]
    fn stats_in_overage() {
        let (mut balance, now) = balance(130, 10);
        balance.subscription_tier = SubscriptionTier::Essential;
        let stats = CreditStats::compute(&balance, now);

        assert_eq!(stats.total, 110);
        assert_eq!(stats.available, 0);
        assert_eq!(stats.overage, 20);
        assert_eq!(stats.overage_cost_cents, 1000);
        assert!(stats.is_overage);

        let alerts = stats.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Overage);
        assert!(alerts[0].message.contains("$10.00"));
    }

    #[test]
    fn remaining_days_rounds_up_and_floors_at_zero() {
        let (balance, now) = balance(0, 0);
        let later = balance.reset_date - Duration::hours(1);
        assert_eq!(CreditStats::compute(&balance, later).remaining_days, 1);

        let past = balance.reset_date + Duration::days(3);
        assert_eq!(CreditStats::compute(&balance, past).remaining_days, 0);
        assert!(CreditStats::compute(&balance, now).remaining_days > 0);
    }

    #[test]
    fn zero_total_usage_percent() {
        let (mut balance, now) = balance(0, 0);
        balance.base_credits = 0;
        assert!(CreditStats::compute(&balance, now).usage_percent.abs() < f64::EPSILON);

        balance.used_credits = 3;
        let stats = CreditStats::compute(&balance, now);
        assert!((stats.usage_percent - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn huge_counters_saturate() {
        let (mut balance, now) = balance(i64::MAX, 0);
        let stats = CreditStats::compute(&balance, now);
        assert_eq!(stats.overage, i64::MAX - 100);
        assert_eq!(stats.overage_cost_cents, i64::MAX);
        assert!(stats.is_overage);

        balance.used_credits = 0;
        balance.purchased_credits = i64::MAX;
        let stats = CreditStats::compute(&balance, now);
        assert_eq!(stats.total, i64::MAX);
        assert_eq!(stats.available, i64::MAX);
        assert!(stats.usage_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn low_credit_alert_at_threshold() {
        let (balance, now) = balance(80, 0);
        let alerts = CreditStats::compute(&balance, now).alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::LowCredits);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn depleted_alert_at_exact_total() {
        let (balance, now) = balance(100, 0);
        let alerts = CreditStats::compute(&balance, now).alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Depleted);
    }
}
