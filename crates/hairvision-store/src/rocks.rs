//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Calls are synchronous under the hood; point reads and small batches are
//! cheap enough to run on the async worker.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use hairvision_core::{CreditBalance, CreditUsageRecord, SalonId, UsageRecordId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::debug!(path = %path.as_ref().display(), "Opened RocksDB");

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_usage_record(&self, record_id: &UsageRecordId) -> Result<Option<CreditUsageRecord>> {
        let cf = self.cf(cf::USAGE_RECORDS)?;

        self.db
            .get_cf(&cf, keys::usage_record_key(record_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Write a usage record, its salon index entry and optionally the
    /// updated balance in a single batch.
    fn write_usage(
        &self,
        record: &CreditUsageRecord,
        balance: Option<&CreditBalance>,
    ) -> Result<()> {
        if self.get_usage_record(&record.id)?.is_some() {
            return Err(StoreError::DuplicateRecord {
                record_id: record.id.to_string(),
            });
        }

        let cf_records = self.cf(cf::USAGE_RECORDS)?;
        let cf_by_salon = self.cf(cf::USAGE_BY_SALON)?;

        let record_key = keys::usage_record_key(&record.id);
        let salon_key = keys::salon_usage_key(&record.salon_id, &record.id);
        let value = Self::serialize(record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_records, &record_key, &value);
        batch.put_cf(&cf_by_salon, &salon_key, []); // Index entry (empty value)

        if let Some(balance) = balance {
            let cf_balances = self.cf(cf::BALANCES)?;
            batch.put_cf(
                &cf_balances,
                keys::balance_key(&balance.salon_id),
                Self::serialize(balance)?,
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Store for RocksStore {
    // =========================================================================
    // Balance Operations
    // =========================================================================

    async fn get_balance(&self, salon_id: &SalonId) -> Result<Option<CreditBalance>> {
        let cf = self.cf(cf::BALANCES)?;
        let key = keys::balance_key(salon_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    async fn put_balance(&self, balance: &CreditBalance) -> Result<()> {
        let cf = self.cf(cf::BALANCES)?;
        let key = keys::balance_key(&balance.salon_id);
        let value = Self::serialize(balance)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    // =========================================================================
    // Usage Operations
    // =========================================================================

    async fn append_usage(&self, record: &CreditUsageRecord) -> Result<()> {
        self.write_usage(record, None)
    }

    async fn record_usage(
        &self,
        balance: &CreditBalance,
        record: &CreditUsageRecord,
    ) -> Result<()> {
        self.write_usage(record, Some(balance))
    }

    async fn list_usage(
        &self,
        salon_id: &SalonId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditUsageRecord>> {
        let cf_by_salon = self.cf(cf::USAGE_BY_SALON)?;
        let prefix = keys::salon_usage_prefix(salon_id);
        let upper = keys::salon_usage_upper_bound(salon_id);

        // Walk the salon's index backwards from the end of its range (newest first)
        let iter = self
            .db
            .iterator_cf(&cf_by_salon, IteratorMode::From(&upper, Direction::Reverse));

        let mut records = Vec::new();
        let mut skipped = 0;

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                if &*key < prefix.as_slice() {
                    break;
                }
                continue;
            }

            if skipped < offset {
                skipped += 1;
                continue;
            }

            if records.len() >= limit {
                break;
            }

            let Some(record_id) = keys::extract_record_id(&key) else {
                continue;
            };
            if let Some(record) = self.get_usage_record(&record_id)? {
                records.push(record);
            }
        }

        Ok(records)
    }
}
