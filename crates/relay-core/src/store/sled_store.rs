//! Persistent store backed by `sled`.
//!
//! Trees:
//! - `clients`: client id -> JSON [`ClientRecord`]
//! - `subscriptions`: `client_id \0 channel` -> big-endian `last_polled`
//! - `subscribers`: `channel \0 client_id` -> empty, for fan-out counts
//! - `messages`: [`LogPosition`] key -> JSON [`Message`]
//!
//! Message keys sort in log order, so a poll is a single range scan starting
//! just after the cursor.

use std::path::Path;
use std::sync::Mutex;

use sled::{Db, Tree};
use tracing::{debug, trace};

use super::{ClientRecord, Store};
use crate::channel::ChannelId;
use crate::clock::{stamp_after, LogPosition, Timestamp};
use crate::error::StoreError;
use crate::message::{Message, MessageDraft};

const KEY_SEPARATOR: u8 = 0;

fn pair_key(first: &str, second: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(first.len() + second.len() + 1);
    key.extend_from_slice(first.as_bytes());
    key.push(KEY_SEPARATOR);
    key.extend_from_slice(second.as_bytes());
    key
}

fn pair_prefix(first: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(first.len() + 1);
    prefix.extend_from_slice(first.as_bytes());
    prefix.push(KEY_SEPARATOR);
    prefix
}

fn decode_timestamp(bytes: &[u8]) -> Result<Timestamp, StoreError> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("timestamp of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(bytes))
}

/// [`Store`] on a sled database.
pub struct SledStore {
    db: Db,
    clients: Tree,
    subscriptions: Tree,
    subscribers: Tree,
    messages: Tree,
    /// Serializes appends; holds the newest message timestamp.
    append_lock: Mutex<Timestamp>,
}

impl SledStore {
    /// Open or create a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if sled cannot open the path or the log is corrupt.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_db(sled::open(path)?)
    }

    /// A throwaway database removed on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if sled cannot create the temporary database.
    pub fn temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        let clients = db.open_tree("clients")?;
        let subscriptions = db.open_tree("subscriptions")?;
        let subscribers = db.open_tree("subscribers")?;
        let messages = db.open_tree("messages")?;

        let newest = match messages.last()? {
            Some((key, _)) => LogPosition::from_key(&key)?.timestamp,
            None => 0,
        };
        debug!(
            messages = messages.len(),
            clients = clients.len(),
            newest,
            "Opened sled store"
        );

        Ok(Self {
            db,
            clients,
            subscriptions,
            subscribers,
            messages,
            append_lock: Mutex::new(newest),
        })
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("db", &"sled::Db")
            .field("messages", &self.messages.len())
            .finish()
    }
}

impl Store for SledStore {
    fn insert_client(&self, client: &ClientRecord) -> Result<(), StoreError> {
        self.clients
            .insert(client.id.as_bytes(), serde_json::to_vec(client)?)?;
        Ok(())
    }

    fn client(&self, id: &str) -> Result<Option<ClientRecord>, StoreError> {
        match self.clients.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn touch_client(&self, id: &str, now: Timestamp) -> Result<(), StoreError> {
        if let Some(mut client) = self.client(id)? {
            client.last_seen = now;
            self.insert_client(&client)?;
        }
        Ok(())
    }

    fn insert_subscription(
        &self,
        client_id: &str,
        channel: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let created = self
            .subscriptions
            .compare_and_swap(
                pair_key(client_id, channel),
                None as Option<&[u8]>,
                Some(&now.to_be_bytes()[..]),
            )?
            .is_ok();

        if created {
            self.subscribers
                .insert(pair_key(channel, client_id), &[] as &[u8])?;
        }
        Ok(created)
    }

    fn client_channels(&self, client_id: &str) -> Result<Vec<ChannelId>, StoreError> {
        let prefix = pair_prefix(client_id);
        self.subscriptions
            .scan_prefix(&prefix)
            .keys()
            .map(|key| {
                let key = key?;
                String::from_utf8(key[prefix.len()..].to_vec())
                    .map_err(|e| StoreError::Corrupt(format!("channel name: {e}")))
            })
            .collect()
    }

    fn subscriber_count(&self, channel: &str) -> Result<usize, StoreError> {
        let mut count = 0;
        for key in self.subscribers.scan_prefix(pair_prefix(channel)).keys() {
            key?;
            count += 1;
        }
        Ok(count)
    }

    fn last_polled(
        &self,
        client_id: &str,
        channel: &str,
    ) -> Result<Option<Timestamp>, StoreError> {
        self.subscriptions
            .get(pair_key(client_id, channel))?
            .map(|bytes| decode_timestamp(&bytes))
            .transpose()
    }

    fn touch_subscriptions(&self, client_id: &str, now: Timestamp) -> Result<usize, StoreError> {
        let keys: Vec<_> = self
            .subscriptions
            .scan_prefix(pair_prefix(client_id))
            .keys()
            .collect::<Result<_, _>>()?;

        for key in &keys {
            self.subscriptions.insert(key, &now.to_be_bytes()[..])?;
        }
        Ok(keys.len())
    }

    fn append_message(&self, draft: MessageDraft) -> Result<Message, StoreError> {
        let mut newest = self.append_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let position = LogPosition::new(stamp_after(*newest), self.db.generate_id()?);
        let message = draft.stamp(position);
        self.messages
            .insert(position.to_key(), serde_json::to_vec(&message)?)?;
        *newest = position.timestamp;

        trace!(id = %message.id, seq = position.seq, "Appended message");
        Ok(message)
    }

    fn messages_since(
        &self,
        since: Timestamp,
        recipient: &str,
        channels: &[ChannelId],
    ) -> Result<Vec<Message>, StoreError> {
        let Some(start) = LogPosition::after(since) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for entry in self.messages.range(start.to_key()..) {
            let (_, value) = entry?;
            let message: Message = serde_json::from_slice(&value)?;
            if message.is_visible_to(recipient, channels) {
                found.push(message);
            }
        }
        Ok(found)
    }

    fn message_count(&self) -> Result<usize, StoreError> {
        Ok(self.messages.len())
    }
}
