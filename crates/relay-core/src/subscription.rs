//! Durable `(client, channel)` subscriptions.
//!
//! A subscription is the only thing that makes a client a recipient of a
//! topic. Its `last_polled` field is liveness telemetry, not a delivery
//! cursor.

use std::sync::Arc;

use tracing::debug;

use crate::channel::{validate_channel_name, ChannelId};
use crate::clock::{now_millis, Timestamp};
use crate::error::{RelayError, StoreError};
use crate::store::Store;

/// Tracks which clients listen on which channels.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    store: Arc<dyn Store>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Subscribe a client to a channel.
    ///
    /// Idempotent: a repeated call is a no-op and leaves `last_polled` alone.
    /// Returns `true` if the subscription is new.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel name is invalid or the store fails.
    pub fn subscribe(&self, client_id: &str, channel: &str) -> Result<bool, RelayError> {
        validate_channel_name(channel).map_err(|e| RelayError::Malformed(e.to_string()))?;

        let created = self
            .store
            .insert_subscription(client_id, channel, now_millis())?;

        debug!(
            client = %client_id,
            channel = %channel,
            created,
            "Subscribed"
        );
        Ok(created)
    }

    /// Channels the client is subscribed to.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn subscribed_channels(&self, client_id: &str) -> Result<Vec<ChannelId>, StoreError> {
        self.store.client_channels(client_id)
    }

    /// Number of subscriptions on exactly this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn subscriber_count(&self, channel: &str) -> Result<usize, StoreError> {
        self.store.subscriber_count(channel)
    }

    /// Stamp every subscription of the client as polled at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn advance_cursor(&self, client_id: &str, now: Timestamp) -> Result<usize, StoreError> {
        self.store.touch_subscriptions(client_id, now)
    }

    /// When the client last polled while subscribed to `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn last_polled(
        &self,
        client_id: &str,
        channel: &str,
    ) -> Result<Option<Timestamp>, StoreError> {
        self.store.last_polled(client_id, channel)
    }
}
