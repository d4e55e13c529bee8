//! PostgreSQL storage implementation.
//!
//! Usage record IDs are stored as their ULID string form. Crockford base32
//! sorts the same way as the underlying bytes and IDs are monotonic per
//! process, so `ORDER BY id DESC` returns newest first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgExecutor, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use hairvision_core::{CreditBalance, CreditUsageRecord, SalonId};

use crate::error::{Result, StoreError};
use crate::Store;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// PostgreSQL-backed storage implementation.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot establish a connection.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(url)
            .await?;

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        let migrator = sqlx::migrate!("./migrations");
        migrator.run(&self.pool).await?;
        tracing::debug!(count = migrator.iter().count(), "Schema migrations up to date");
        Ok(())
    }

    fn balance_from_row(row: &PgRow) -> Result<CreditBalance> {
        let salon_id: String = row.try_get("salon_id")?;
        let tier: String = row.try_get("subscription_tier")?;

        Ok(CreditBalance {
            salon_id: parse_column(&salon_id)?,
            subscription_tier: parse_column(&tier)?,
            base_credits: row.try_get("base_credits")?,
            used_credits: row.try_get("used_credits")?,
            purchased_credits: row.try_get("purchased_credits")?,
            reset_date: row.try_get::<DateTime<Utc>, _>("reset_date")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn usage_from_row(row: &PgRow) -> Result<CreditUsageRecord> {
        let id: String = row.try_get("id")?;
        let salon_id: String = row.try_get("salon_id")?;
        let resolution: String = row.try_get("resolution")?;

        Ok(CreditUsageRecord {
            id: parse_column(&id)?,
            salon_id: parse_column(&salon_id)?,
            credits_used: row.try_get("credits_used")?,
            model: row.try_get("model")?,
            resolution: parse_column(&resolution)?,
            cost_cents: row.try_get("cost_cents")?,
            timestamp: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }
}

fn parse_column<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Serialization(e.to_string()))
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

async fn upsert_balance<'e, E>(executor: E, balance: &CreditBalance) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO credit_balances \
            (salon_id, subscription_tier, base_credits, used_credits, purchased_credits, \
             reset_date, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (salon_id) DO UPDATE SET \
            subscription_tier = EXCLUDED.subscription_tier, \
            base_credits = EXCLUDED.base_credits, \
            used_credits = EXCLUDED.used_credits, \
            purchased_credits = EXCLUDED.purchased_credits, \
            reset_date = EXCLUDED.reset_date, \
            updated_at = EXCLUDED.updated_at",
    )
    .bind(balance.salon_id.as_str())
    .bind(balance.subscription_tier.as_str())
    .bind(balance.base_credits)
    .bind(balance.used_credits)
    .bind(balance.purchased_credits)
    .bind(balance.reset_date)
    .bind(balance.created_at)
    .bind(balance.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

async fn insert_usage<'e, E>(executor: E, record: &CreditUsageRecord) -> Result<()>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "INSERT INTO credit_usage \
            (id, salon_id, credits_used, model, resolution, cost_cents, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id.to_string())
    .bind(record.salon_id.as_str())
    .bind(record.credits_used)
    .bind(&record.model)
    .bind(record.resolution.as_str())
    .bind(record.cost_cents)
    .bind(record.timestamp)
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(StoreError::DuplicateRecord {
                record_id: record.id.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_balance(&self, salon_id: &SalonId) -> Result<Option<CreditBalance>> {
        let row = sqlx::query(
            "SELECT salon_id, subscription_tier, base_credits, used_credits, purchased_credits, \
                    reset_date, created_at, updated_at \
             FROM credit_balances WHERE salon_id = $1",
        )
        .bind(salon_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::balance_from_row).transpose()
    }

    async fn put_balance(&self, balance: &CreditBalance) -> Result<()> {
        upsert_balance(&self.pool, balance).await
    }

    async fn append_usage(&self, record: &CreditUsageRecord) -> Result<()> {
        insert_usage(&self.pool, record).await
    }

    async fn record_usage(
        &self,
        balance: &CreditBalance,
        record: &CreditUsageRecord,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_usage(&mut *tx, record).await?;
        upsert_balance(&mut *tx, balance).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_usage(
        &self,
        salon_id: &SalonId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditUsageRecord>> {
        let rows = sqlx::query(
            "SELECT id, salon_id, credits_used, model, resolution, cost_cents, created_at \
             FROM credit_usage WHERE salon_id = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(salon_id.as_str())
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::usage_from_row).collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
