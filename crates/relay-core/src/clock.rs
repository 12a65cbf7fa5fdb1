//! Timestamps and log positions.
//!
//! Message timestamps are wall-clock milliseconds, clamped so they never go
//! backwards in insertion order. Each message also gets a sequence number, and
//! the pair `(timestamp, seq)` totally orders the log even when many messages
//! share a millisecond.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current wall-clock time in milliseconds.
#[must_use]
pub fn now_millis() -> Timestamp {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Next timestamp for a log whose newest entry is stamped `last`.
#[must_use]
pub fn stamp_after(last: Timestamp) -> Timestamp {
    now_millis().max(last)
}

/// Position of a message in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogPosition {
    pub timestamp: Timestamp,
    pub seq: u64,
}

impl LogPosition {
    /// Encoded key length in bytes.
    pub const KEY_LEN: usize = 16;

    #[must_use]
    pub const fn new(timestamp: Timestamp, seq: u64) -> Self {
        Self { timestamp, seq }
    }

    /// The first position strictly after every message stamped `since`.
    ///
    /// Returns `None` when nothing can follow `since`.
    #[must_use]
    pub fn after(since: Timestamp) -> Option<Self> {
        since.checked_add(1).map(|timestamp| Self::new(timestamp, 0))
    }

    /// Big-endian key; byte order matches `Ord`.
    #[must_use]
    pub fn to_key(self) -> [u8; Self::KEY_LEN] {
        let mut key = [0u8; Self::KEY_LEN];
        key[..8].copy_from_slice(&self.timestamp.to_be_bytes());
        key[8..].copy_from_slice(&self.seq.to_be_bytes());
        key
    }

    /// Decode a key produced by [`LogPosition::to_key`].
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not exactly [`LogPosition::KEY_LEN`] bytes.
    pub fn from_key(key: &[u8]) -> Result<Self, StoreError> {
        let bytes: [u8; Self::KEY_LEN] = key
            .try_into()
            .map_err(|_| StoreError::Corrupt(format!("log key of {} bytes", key.len())))?;
        let mut timestamp = [0u8; 8];
        let mut seq = [0u8; 8];
        timestamp.copy_from_slice(&bytes[..8]);
        seq.copy_from_slice(&bytes[8..]);
        Ok(Self::new(
            u64::from_be_bytes(timestamp),
            u64::from_be_bytes(seq),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_never_goes_backwards() {
        let future = now_millis() + 60_000;
        assert_eq!(stamp_after(future), future);
        assert!(stamp_after(0) > 0);
    }

    #[test]
    fn test_key_order_matches_position_order() {
        let positions = [
            LogPosition::new(1, 9),
            LogPosition::new(2, 0),
            LogPosition::new(2, 1),
            LogPosition::new(256, 0),
        ];
        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].to_key() < pair[1].to_key());
        }
    }

    #[test]
    fn test_key_decoding() {
        let pos = LogPosition::new(1_700_000_000_000, 77);
        assert_eq!(LogPosition::from_key(&pos.to_key()).unwrap(), pos);
        assert!(LogPosition::from_key(b"short").is_err());
    }

    #[test]
    fn test_after() {
        assert_eq!(LogPosition::after(5), Some(LogPosition::new(6, 0)));
        assert_eq!(LogPosition::after(u64::MAX), None);
    }
}
