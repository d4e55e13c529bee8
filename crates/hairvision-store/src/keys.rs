//! Key encoding utilities for `RocksDB`.
//!
//! Salon IDs are variable length, so index keys separate the salon from the
//! record ID with a `0x00` byte. Salon IDs never contain that byte.

use hairvision_core::{SalonId, UsageRecordId};

const SEPARATOR: u8 = 0x00;
const RECORD_ID_LEN: usize = 16;

/// Create a balance key from a salon ID.
#[must_use]
pub fn balance_key(salon_id: &SalonId) -> Vec<u8> {
    salon_id.as_bytes().to_vec()
}

/// Create a usage record key from a record ID.
#[must_use]
pub fn usage_record_key(record_id: &UsageRecordId) -> Vec<u8> {
    record_id.to_bytes().to_vec()
}

/// Create a salon-usage index key.
///
/// Format: `salon_id || 0x00 || record_id (16 bytes)`
///
/// Since ULIDs are time-ordered, records for a salon sort by time.
#[must_use]
pub fn salon_usage_key(salon_id: &SalonId, record_id: &UsageRecordId) -> Vec<u8> {
    let mut key = salon_usage_prefix(salon_id);
    key.extend_from_slice(&record_id.to_bytes());
    key
}

/// Create a prefix for iterating all usage records for a salon.
#[must_use]
pub fn salon_usage_prefix(salon_id: &SalonId) -> Vec<u8> {
    let bytes = salon_id.as_bytes();
    let mut key = Vec::with_capacity(bytes.len() + 1 + RECORD_ID_LEN);
    key.extend_from_slice(bytes);
    key.push(SEPARATOR);
    key
}

/// Smallest key sorting after every index key for a salon.
#[must_use]
pub fn salon_usage_upper_bound(salon_id: &SalonId) -> Vec<u8> {
    let mut key = salon_id.as_bytes().to_vec();
    key.push(SEPARATOR + 1);
    key
}

/// Extract the record ID from a salon-usage index key.
///
/// Returns `None` if the key is too short to hold a record ID.
#[must_use]
pub fn extract_record_id(key: &[u8]) -> Option<UsageRecordId> {
    let start = key.len().checked_sub(RECORD_ID_LEN)?;
    let bytes: [u8; RECORD_ID_LEN] = key[start..].try_into().ok()?;
    Some(UsageRecordId::from_bytes(bytes))
}
