//! Storage backends.
//!
//! Every relay component works against the [`Store`] trait. Each call is
//! atomic on its own; no transaction spans calls.

mod memory;
mod sled_store;

pub use self::memory::MemoryStore;
pub use self::sled_store::SledStore;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::channel::ChannelId;
use crate::clock::Timestamp;
use crate::error::StoreError;
use crate::identity::ClientId;
use crate::message::{Message, MessageDraft};

/// Path value that selects the in-memory backend.
pub const MEMORY_PATH: &str = ":memory:";

/// A registered client row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: ClientId,
    pub secret: String,
    pub last_seen: Timestamp,
}

/// Row-level storage used by the relay.
pub trait Store: Send + Sync {
    /// Insert a new client row.
    fn insert_client(&self, client: &ClientRecord) -> Result<(), StoreError>;

    /// Look up a client row.
    fn client(&self, id: &str) -> Result<Option<ClientRecord>, StoreError>;

    /// Set `last_seen` on a client. Unknown ids are ignored.
    fn touch_client(&self, id: &str, now: Timestamp) -> Result<(), StoreError>;

    /// Insert a subscription unless it already exists.
    ///
    /// Returns `true` if a row was created. An existing row is left untouched.
    fn insert_subscription(
        &self,
        client_id: &str,
        channel: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Channels `client_id` is subscribed to.
    fn client_channels(&self, client_id: &str) -> Result<Vec<ChannelId>, StoreError>;

    /// Number of subscriptions on exactly `channel`.
    fn subscriber_count(&self, channel: &str) -> Result<usize, StoreError>;

    /// `last_polled` of one subscription.
    fn last_polled(&self, client_id: &str, channel: &str)
        -> Result<Option<Timestamp>, StoreError>;

    /// Set `last_polled` on every subscription of `client_id`.
    ///
    /// Returns the number of rows touched.
    fn touch_subscriptions(&self, client_id: &str, now: Timestamp) -> Result<usize, StoreError>;

    /// Stamp and append a message.
    ///
    /// Appends are serialized: the returned position is greater than that of
    /// every message appended before, and its timestamp is not smaller.
    fn append_message(&self, draft: MessageDraft) -> Result<Message, StoreError>;

    /// Messages with `timestamp > since` addressed to `recipient` or to any of
    /// `channels`, in log order.
    fn messages_since(
        &self,
        since: Timestamp,
        recipient: &str,
        channels: &[ChannelId],
    ) -> Result<Vec<Message>, StoreError>;

    /// Total number of logged messages.
    fn message_count(&self) -> Result<usize, StoreError>;
}

/// Open the backend named by `path`: [`MEMORY_PATH`] for a volatile store,
/// anything else is a sled database directory.
///
/// # Errors
///
/// Returns an error if the sled database cannot be opened.
pub fn open(path: &str) -> Result<Arc<dyn Store>, StoreError> {
    if path == MEMORY_PATH {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    info!(path = %path, "Opening sled store");
    Ok(Arc::new(SledStore::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let store = open(MEMORY_PATH).unwrap();
        assert_eq!(store.message_count().unwrap(), 0);
    }

    #[test]
    fn test_open_sled_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");
        let store = open(path.to_str().unwrap()).unwrap();
        assert_eq!(store.message_count().unwrap(), 0);
    }
}
