//! Storage layer for HairVision credits.
//!
//! This crate persists the two things the credit ledger needs: one
//! [`CreditBalance`] per salon and the append-only history of
//! [`CreditUsageRecord`]s.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local maps, used in tests and local development.
//! - [`PgStore`]: PostgreSQL via `sqlx`, the production backend.
//! - `RocksStore`: embedded `RocksDB` with CBOR values, behind the
//!   `rocksdb-backend` feature.
//!
//! Stores do no locking across calls. Read-modify-write sequences on a
//! balance are serialized by the caller; [`Store::record_usage`] is the one
//! write that spans both the balance and the history.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use hairvision_core::{CreditBalance, SalonId};
//! use hairvision_store::{MemoryStore, Store};
//!
//! # async fn example() -> hairvision_store::Result<()> {
//! let store = MemoryStore::new();
//! let salon_id: SalonId = "salon-1".parse().unwrap();
//!
//! store.put_balance(&CreditBalance::new(salon_id.clone(), Utc::now())).await?;
//! let balance = store.get_balance(&salon_id).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
pub mod postgres;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use hairvision_core::{CreditBalance, CreditUsageRecord, SalonId};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (PostgreSQL, `RocksDB`, in-memory for testing).
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Balance Operations
    // =========================================================================

    /// Get the balance row for a salon.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_balance(&self, salon_id: &SalonId) -> Result<Option<CreditBalance>>;

    /// Insert or replace the balance row for a salon.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_balance(&self, balance: &CreditBalance) -> Result<()>;

    // =========================================================================
    // Usage Operations
    // =========================================================================

    /// Append a usage record.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateRecord` if a record with the same ID exists.
    /// - `StoreError::Database` if the database operation fails.
    async fn append_usage(&self, record: &CreditUsageRecord) -> Result<()>;

    /// Persist an updated balance together with the usage record that
    /// produced it. Either both writes land or neither does.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateRecord` if a record with the same ID exists;
    ///   the balance is left unchanged.
    /// - `StoreError::Database` if the database operation fails.
    async fn record_usage(
        &self,
        balance: &CreditBalance,
        record: &CreditUsageRecord,
    ) -> Result<()>;

    /// List usage records for a salon, ordered by time (newest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_usage(
        &self,
        salon_id: &SalonId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditUsageRecord>>;

    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot serve requests.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
