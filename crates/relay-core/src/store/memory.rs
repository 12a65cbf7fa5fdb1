//! Volatile in-process store.

use std::sync::RwLock;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tracing::trace;

use super::{ClientRecord, Store};
use crate::channel::ChannelId;
use crate::clock::{stamp_after, LogPosition, Timestamp};
use crate::error::StoreError;
use crate::identity::ClientId;
use crate::message::{Message, MessageDraft};

/// In-memory [`Store`].
///
/// Clients and subscriptions live in concurrent maps; the log is a vector
/// kept in position order by appending under its write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Clients indexed by id.
    clients: DashMap<ClientId, ClientRecord>,
    /// Client subscriptions (client_id -> channel -> last_polled).
    subscriptions: DashMap<ClientId, DashMap<ChannelId, Timestamp>>,
    /// Reverse index (channel -> subscribed client ids).
    subscribers: DashMap<ChannelId, DashSet<ClientId>>,
    /// The message log.
    messages: RwLock<Vec<Message>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn insert_client(&self, client: &ClientRecord) -> Result<(), StoreError> {
        self.clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    fn client(&self, id: &str) -> Result<Option<ClientRecord>, StoreError> {
        Ok(self.clients.get(id).map(|c| c.clone()))
    }

    fn touch_client(&self, id: &str, now: Timestamp) -> Result<(), StoreError> {
        if let Some(mut client) = self.clients.get_mut(id) {
            client.last_seen = now;
        }
        Ok(())
    }

    fn insert_subscription(
        &self,
        client_id: &str,
        channel: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let channels = self
            .subscriptions
            .entry(client_id.to_string())
            .or_default();

        let created = match channels.entry(channel.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        };
        drop(channels);

        if created {
            self.subscribers
                .entry(channel.to_string())
                .or_default()
                .insert(client_id.to_string());
        }
        Ok(created)
    }

    fn client_channels(&self, client_id: &str) -> Result<Vec<ChannelId>, StoreError> {
        Ok(self
            .subscriptions
            .get(client_id)
            .map(|s| s.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default())
    }

    fn subscriber_count(&self, channel: &str) -> Result<usize, StoreError> {
        Ok(self.subscribers.get(channel).map(|s| s.len()).unwrap_or(0))
    }

    fn last_polled(
        &self,
        client_id: &str,
        channel: &str,
    ) -> Result<Option<Timestamp>, StoreError> {
        Ok(self
            .subscriptions
            .get(client_id)
            .and_then(|s| s.get(channel).map(|t| *t)))
    }

    fn touch_subscriptions(&self, client_id: &str, now: Timestamp) -> Result<usize, StoreError> {
        let Some(channels) = self.subscriptions.get(client_id) else {
            return Ok(0);
        };
        for mut entry in channels.iter_mut() {
            *entry.value_mut() = now;
        }
        Ok(channels.len())
    }

    fn append_message(&self, draft: MessageDraft) -> Result<Message, StoreError> {
        let mut log = self.messages.write().map_err(|_| StoreError::Poisoned)?;

        let position = match log.last() {
            Some(last) => LogPosition::new(stamp_after(last.timestamp), last.seq + 1),
            None => LogPosition::new(stamp_after(0), 1),
        };
        let message = draft.stamp(position);
        log.push(message.clone());

        trace!(id = %message.id, seq = position.seq, "Appended message");
        Ok(message)
    }

    fn messages_since(
        &self,
        since: Timestamp,
        recipient: &str,
        channels: &[ChannelId],
    ) -> Result<Vec<Message>, StoreError> {
        let log = self.messages.read().map_err(|_| StoreError::Poisoned)?;

        let start = log.partition_point(|m| m.timestamp <= since);
        Ok(log[start..]
            .iter()
            .filter(|m| m.is_visible_to(recipient, channels))
            .cloned()
            .collect())
    }

    fn message_count(&self) -> Result<usize, StoreError> {
        Ok(self.messages.read().map_err(|_| StoreError::Poisoned)?.len())
    }
}
