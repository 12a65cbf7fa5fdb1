//! Typed commands accepted by [`Relay::execute`](crate::Relay::execute).
//!
//! The boundary (HTTP handlers, tests) validates raw input into one of these
//! before any domain logic runs.

use relay_protocol::{Publish, Subscribe, ValidIngest};

use crate::clock::Timestamp;
use crate::identity::{ClientId, Credentials};
use crate::message::{Message, MessageId, Publication};

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a new client.
    Register,

    /// Publish on behalf of an authenticated sender.
    Publish {
        sender: ClientId,
        channel: String,
        content: String,
        parent_id: Option<MessageId>,
    },

    /// Subscribe an authenticated client to a channel.
    Subscribe { client: ClientId, channel: String },

    /// Fetch messages newer than `since`.
    Poll {
        client: ClientId,
        since: Option<Timestamp>,
    },

    /// Publish to a client using its shared secret.
    ExternalIngest {
        client_id: ClientId,
        secret: String,
        content: String,
    },
}

impl Command {
    /// Build a publish command from a validated body.
    #[must_use]
    pub fn publish(sender: impl Into<ClientId>, body: Publish) -> Self {
        Command::Publish {
            sender: sender.into(),
            channel: body.channel,
            content: body.content,
            parent_id: body.parent_id,
        }
    }

    /// Build a subscribe command from a validated body.
    #[must_use]
    pub fn subscribe(client: impl Into<ClientId>, body: Subscribe) -> Self {
        Command::Subscribe {
            client: client.into(),
            channel: body.channel,
        }
    }

    #[must_use]
    pub fn poll(client: impl Into<ClientId>, since: Option<Timestamp>) -> Self {
        Command::Poll {
            client: client.into(),
            since,
        }
    }

    #[must_use]
    pub fn ingest(body: ValidIngest) -> Self {
        Command::ExternalIngest {
            client_id: body.client_id,
            secret: body.secret,
            content: body.content,
        }
    }

    /// Short name for logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Register => "register",
            Command::Publish { .. } => "publish",
            Command::Subscribe { .. } => "subscribe",
            Command::Poll { .. } => "poll",
            Command::ExternalIngest { .. } => "external_ingest",
        }
    }
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Registered(Credentials),
    Published(Publication),
    Subscribed,
    Messages(Vec<Message>),
    Ingested(MessageId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_validated_bodies() {
        let cmd = Command::publish(
            "c-1",
            Publish {
                channel: "news/general".into(),
                content: "update".into(),
                parent_id: None,
            },
        );
        assert_eq!(cmd.name(), "publish");
        assert!(matches!(cmd, Command::Publish { ref sender, .. } if sender == "c-1"));

        let cmd = Command::subscribe(
            "c-1",
            Subscribe {
                channel: "news/general".into(),
            },
        );
        assert_eq!(
            cmd,
            Command::Subscribe {
                client: "c-1".into(),
                channel: "news/general".into()
            }
        );
        assert_eq!(Command::poll("c-1", None).name(), "poll");
    }
}
