//! Identifier types for HairVision.
//!
//! Salon identifiers are opaque strings handed to us by the product database.
//! Usage record identifiers are ULIDs so the history sorts chronologically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use ulid::{Generator, Ulid};

/// Process-wide generator so IDs minted in the same millisecond stay ordered.
static USAGE_ID_GENERATOR: Mutex<Generator> = Mutex::new(Generator::new());

/// Maximum length of a salon identifier.
pub const MAX_SALON_ID_LEN: usize = 128;

/// A salon identifier.
///
/// Salons are the billing unit for credits. The identifier is opaque but
/// restricted to `[A-Za-z0-9_-]` so it can be embedded in URL paths and
/// storage keys without escaping.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SalonId(String);

impl SalonId {
    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the identifier bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for SalonId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdError::EmptySalonId);
        }
        if s.len() > MAX_SALON_ID_LEN {
            return Err(IdError::SalonIdTooLong);
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(IdError::InvalidSalonId);
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for SalonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SalonId({})", self.0)
    }
}

impl fmt::Display for SalonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SalonId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SalonId> for String {
    fn from(id: SalonId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for SalonId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A usage record identifier using ULID for time-ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsageRecordId(Ulid);

impl UsageRecordId {
    /// Generate a new `UsageRecordId` with the current timestamp.
    ///
    /// IDs from one process are strictly increasing, even within a single
    /// millisecond.
    #[must_use]
    pub fn generate() -> Self {
        let mut generator = USAGE_ID_GENERATOR
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // The random part only overflows after 2^80 IDs in one millisecond.
        Self(generator.generate().unwrap_or_else(|_| Ulid::new()))
    }

    /// Return the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> &Ulid {
        &self.0
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create a `UsageRecordId` from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl FromStr for UsageRecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for UsageRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UsageRecordId({})", self.0)
    }
}

impl fmt::Display for UsageRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for UsageRecordId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UsageRecordId> for String {
    fn from(id: UsageRecordId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The salon identifier is empty.
    #[error("salon id must not be empty")]
    EmptySalonId,

    /// The salon identifier exceeds [`MAX_SALON_ID_LEN`].
    #[error("salon id must be at most {MAX_SALON_ID_LEN} characters")]
    SalonIdTooLong,

    /// The salon identifier contains characters outside `[A-Za-z0-9_-]`.
    #[error("salon id may only contain letters, digits, '-' and '_'")]
    InvalidSalonId,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salon_id_accepts_uuid_and_slug() {
        assert!("7f9c2ba4-e88f-11ee-9d4f-0242ac120002".parse::<SalonId>().is_ok());
        assert!("salon_downtown-01".parse::<SalonId>().is_ok());
    }

    #[test]
    fn salon_id_rejects_bad_input() {
        assert_eq!("".parse::<SalonId>(), Err(IdError::EmptySalonId));
        assert_eq!("a/b".parse::<SalonId>(), Err(IdError::InvalidSalonId));
        assert_eq!("a b".parse::<SalonId>(), Err(IdError::InvalidSalonId));
        assert_eq!(
            "x".repeat(MAX_SALON_ID_LEN + 1).parse::<SalonId>(),
            Err(IdError::SalonIdTooLong)
        );
    }

    #[test]
    fn salon_id_serde_rejects_invalid() {
        let parsed: Result<SalonId, _> = serde_json::from_str("\"bad id\"");
        assert!(parsed.is_err());

        let id: SalonId = serde_json::from_str("\"salon-1\"").unwrap();
        assert_eq!(id.as_str(), "salon-1");
    }

    #[test]
    fn usage_record_ids_are_time_ordered() {
        let first = UsageRecordId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = UsageRecordId::generate();
        assert!(first < second);
    }

    #[test]
    fn usage_record_ids_within_one_millisecond_are_ordered() {
        let ids: Vec<UsageRecordId> = (0..1000).map(|_| UsageRecordId::generate()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn usage_record_id_bytes_roundtrip() {
        let id = UsageRecordId::generate();
        assert_eq!(UsageRecordId::from_bytes(id.to_bytes()), id);
        assert_eq!(id.to_string().parse::<UsageRecordId>().unwrap(), id);
    }
}
