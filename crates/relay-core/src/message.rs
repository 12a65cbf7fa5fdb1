//! Logged messages.

use relay_protocol::MessageBody;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::ChannelId;
use crate::clock::{LogPosition, Timestamp};

/// A unique message identifier.
pub type MessageId = String;

/// Generate a unique message ID.
#[must_use]
pub fn generate_message_id() -> MessageId {
    Uuid::new_v4().to_string()
}

/// A message before the log has stamped it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub id: MessageId,
    pub channel: ChannelId,
    pub sender_id: String,
    pub content: String,
    pub parent_id: Option<MessageId>,
}

impl MessageDraft {
    /// Create a draft with a fresh id.
    #[must_use]
    pub fn new(
        channel: impl Into<ChannelId>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_message_id(),
            channel: channel.into(),
            sender_id: sender_id.into(),
            content: content.into(),
            parent_id: None,
        }
    }

    /// Thread this message under an earlier one. The parent is not checked.
    #[must_use]
    pub fn with_parent(mut self, parent_id: Option<MessageId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Stamp the draft at `position`.
    #[must_use]
    pub fn stamp(self, position: LogPosition) -> Message {
        Message {
            id: self.id,
            channel: self.channel,
            sender_id: self.sender_id,
            content: self.content,
            timestamp: position.timestamp,
            seq: position.seq,
            parent_id: self.parent_id,
        }
    }
}

/// An immutable logged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Recipient client id, or topic name.
    pub channel: ChannelId,
    /// Publishing client.
    pub sender_id: String,
    /// Opaque payload.
    pub content: String,
    /// Milliseconds since the epoch; the poll cursor compares against this.
    pub timestamp: Timestamp,
    /// Log sequence, breaks timestamp ties.
    pub seq: u64,
    /// Optional thread parent.
    pub parent_id: Option<MessageId>,
}

impl Message {
    #[must_use]
    pub fn position(&self) -> LogPosition {
        LogPosition::new(self.timestamp, self.seq)
    }

    /// Whether `client_id` receives this message given its subscriptions.
    #[must_use]
    pub fn is_visible_to(&self, client_id: &str, channels: &[ChannelId]) -> bool {
        self.channel == client_id || channels.iter().any(|c| *c == self.channel)
    }
}

impl From<Message> for MessageBody {
    fn from(message: Message) -> Self {
        MessageBody {
            id: message.id,
            channel: message.channel,
            sender_id: message.sender_id,
            content: message.content,
            timestamp: message.timestamp,
            parent_id: message.parent_id,
        }
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Id of the logged message.
    pub id: MessageId,
    /// Point-in-time fan-out count. Informational, not a receipt.
    pub delivered_to: usize,
}
