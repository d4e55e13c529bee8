//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage. The
//! PostgreSQL schema lives in `migrations/`.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Credit balances, keyed by `salon_id`.
    pub const BALANCES: &str = "balances";

    /// Usage records, keyed by `record_id` (ULID).
    pub const USAGE_RECORDS: &str = "usage_records";

    /// Index: usage records by salon, keyed by `salon_id || 0x00 || record_id`.
    /// Value is empty (index only).
    pub const USAGE_BY_SALON: &str = "usage_by_salon";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::BALANCES, cf::USAGE_RECORDS, cf::USAGE_BY_SALON]
}
