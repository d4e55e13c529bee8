//! In-memory storage implementation.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use hairvision_core::{CreditBalance, CreditUsageRecord, SalonId, UsageRecordId};

use crate::error::{Result, StoreError};
use crate::Store;

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    balances: RwLock<HashMap<SalonId, CreditBalance>>,
    usage: RwLock<UsageMap>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

type UsageMap = HashMap<SalonId, BTreeMap<UsageRecordId, CreditUsageRecord>>;

fn insert_record(usage: &mut UsageMap, record: &CreditUsageRecord) -> Result<()> {
    let records = usage.entry(record.salon_id.clone()).or_default();

    if records.contains_key(&record.id) {
        return Err(StoreError::DuplicateRecord {
            record_id: record.id.to_string(),
        });
    }

    records.insert(record.id, record.clone());
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_balance(&self, salon_id: &SalonId) -> Result<Option<CreditBalance>> {
        Ok(self.balances.read().await.get(salon_id).cloned())
    }

    async fn put_balance(&self, balance: &CreditBalance) -> Result<()> {
        self.balances
            .write()
            .await
            .insert(balance.salon_id.clone(), balance.clone());
        Ok(())
    }

    async fn append_usage(&self, record: &CreditUsageRecord) -> Result<()> {
        let mut usage = self.usage.write().await;
        insert_record(&mut usage, record)
    }

    async fn record_usage(
        &self,
        balance: &CreditBalance,
        record: &CreditUsageRecord,
    ) -> Result<()> {
        // Lock order: balances, then usage.
        let mut balances = self.balances.write().await;
        let mut usage = self.usage.write().await;

        insert_record(&mut usage, record)?;
        balances.insert(balance.salon_id.clone(), balance.clone());
        Ok(())
    }

    async fn list_usage(
        &self,
        salon_id: &SalonId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditUsageRecord>> {
        let usage = self.usage.read().await;

        Ok(usage
            .get(salon_id)
            .map(|records| {
                records
                    .values()
                    .rev()
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hairvision_core::Resolution;

    fn salon(id: &str) -> SalonId {
        id.parse().unwrap()
    }

    fn record(salon_id: &SalonId, credits: i64) -> CreditUsageRecord {
        CreditUsageRecord::new(
            salon_id.clone(),
            credits,
            "gemini-2.5-flash-image".into(),
            Resolution::Standard,
            credits * 4,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn balance_put_and_get() {
        let store = MemoryStore::new();
        let salon_id = salon("salon-1");
        assert!(store.get_balance(&salon_id).await.unwrap().is_none());

        let mut balance = CreditBalance::new(salon_id.clone(), Utc::now());
        balance.used_credits = 12;
        store.put_balance(&balance).await.unwrap();

        let retrieved = store.get_balance(&salon_id).await.unwrap().unwrap();
        assert_eq!(retrieved, balance);
    }

    #[tokio::test]
    async fn usage_newest_first_with_pagination() {
        let store = MemoryStore::new();
        let salon_id = salon("salon-1");

        let first = record(&salon_id, 1);
        std::thread::sleep(std::time::Duration::from_millis(2)); // Ensure different ULIDs
        let second = record(&salon_id, 2);

        store.append_usage(&first).await.unwrap();
        store.append_usage(&second).await.unwrap();
        store.append_usage(&record(&salon("other"), 4)).await.unwrap();

        let all = store.list_usage(&salon_id, 10, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);

        let page2 = store.list_usage(&salon_id, 1, 1).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].id, first.id);

        assert!(store.list_usage(&salon("nobody"), 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_usage_rejected() {
        let store = MemoryStore::new();
        let rec = record(&salon("salon-1"), 1);

        store.append_usage(&rec).await.unwrap();
        let result = store.append_usage(&rec).await;
        assert!(matches!(result, Err(StoreError::DuplicateRecord { .. })));
    }

    #[tokio::test]
    async fn record_usage_is_all_or_nothing() {
        let store = MemoryStore::new();
        let salon_id = salon("salon-1");
        let mut balance = CreditBalance::new(salon_id.clone(), Utc::now());
        balance.used_credits = 1;
        let rec = record(&salon_id, 1);

        store.record_usage(&balance, &rec).await.unwrap();
        assert_eq!(store.get_balance(&salon_id).await.unwrap(), Some(balance.clone()));
        assert_eq!(store.list_usage(&salon_id, 10, 0).await.unwrap().len(), 1);

        let mut retried = balance.clone();
        retried.used_credits = 2;
        let result = store.record_usage(&retried, &rec).await;
        assert!(matches!(result, Err(StoreError::DuplicateRecord { .. })));
        assert_eq!(store.get_balance(&salon_id).await.unwrap(), Some(balance));
        assert_eq!(store.list_usage(&salon_id, 10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn back_to_back_usage_lists_newest_first() {
        let store = MemoryStore::new();
        let salon_id = salon("salon-1");

        let records: Vec<_> = (1..=20).map(|n| record(&salon_id, n)).collect();
        for rec in &records {
            store.append_usage(rec).await.unwrap();
        }

        let listed = store.list_usage(&salon_id, 100, 0).await.unwrap();
        let credits: Vec<i64> = listed.iter().map(|r| r.credits_used).collect();
        assert_eq!(credits, (1..=20).rev().collect::<Vec<_>>());
    }
}
