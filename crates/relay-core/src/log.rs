//! Append-only message log.

use std::sync::Arc;

use tracing::trace;

use crate::channel::ChannelId;
use crate::clock::Timestamp;
use crate::error::StoreError;
use crate::message::{Message, MessageDraft, MessageId};
use crate::store::Store;

/// The record of every published message. Messages are never changed or
/// removed once appended.
#[derive(Clone)]
pub struct MessageLog {
    store: Arc<dyn Store>,
}

impl MessageLog {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append a message, assigning its id, timestamp and sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails; nothing is logged in that case.
    pub fn append(
        &self,
        channel: &str,
        sender_id: &str,
        content: impl Into<String>,
        parent_id: Option<MessageId>,
    ) -> Result<Message, StoreError> {
        let draft = MessageDraft::new(channel, sender_id, content).with_parent(parent_id);
        let message = self.store.append_message(draft)?;
        trace!(
            id = %message.id,
            channel = %message.channel,
            timestamp = message.timestamp,
            "Logged message"
        );
        Ok(message)
    }

    /// Messages newer than `since` addressed to `client_id` directly or to any
    /// of `channels`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn query(
        &self,
        client_id: &str,
        channels: &[ChannelId],
        since: Timestamp,
    ) -> Result<Vec<Message>, StoreError> {
        self.store.messages_since(since, client_id, channels)
    }

    /// Number of messages in the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn len(&self) -> Result<usize, StoreError> {
        self.store.message_count()
    }

    /// Whether the log is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SledStore};

    fn exercise(log: &MessageLog) {
        assert!(log.is_empty().unwrap());

        let first = log.append("c-1", "c-2", "hello", None).unwrap();
        let reply = log
            .append("c-2", "c-1", "hi back", Some(first.id.clone()))
            .unwrap();
        log.append("news/general", "c-2", "update", None).unwrap();
        log.append("news/other", "c-2", "ignored", None).unwrap();

        assert_eq!(log.len().unwrap(), 4);
        assert_ne!(first.id, reply.id);
        assert_eq!(reply.parent_id.as_deref(), Some(first.id.as_str()));
        assert!(reply.position() > first.position());

        let channels = vec!["news/general".to_string()];
        let seen: Vec<_> = log
            .query("c-1", &channels, 0)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(seen, ["hello", "update"]);

        let seen: Vec<_> = log
            .query("c-2", &[], 0)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(seen, ["hi back"]);
    }

    #[test]
    fn test_log_on_memory_store() {
        exercise(&MessageLog::new(Arc::new(MemoryStore::new())));
    }

    #[test]
    fn test_log_on_sled_store() {
        exercise(&MessageLog::new(Arc::new(SledStore::temporary().unwrap())));
    }

    #[test]
    fn test_query_is_strictly_after_since() {
        let log = MessageLog::new(Arc::new(MemoryStore::new()));
        let msg = log.append("c-1", "c-2", "hello", None).unwrap();

        assert_eq!(log.query("c-1", &[], msg.timestamp - 1).unwrap().len(), 1);
        assert!(log.query("c-1", &[], msg.timestamp).unwrap().is_empty());
    }
}
