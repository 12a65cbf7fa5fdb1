//! Publish routing.
//!
//! The router classifies each target once, validates direct recipients,
//! appends to the log and reports the fan-out count.

use tracing::{debug, info, warn};

use crate::channel::{validate_channel_name, Target};
use crate::error::RelayError;
use crate::identity::IdentityStore;
use crate::log::MessageLog;
use crate::message::{MessageId, Publication};
use crate::subscription::SubscriptionRegistry;

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Maximum message content size in bytes.
    pub max_content_size: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_content_size: 64 * 1024,
        }
    }
}

/// Routes publishes into the message log.
#[derive(Clone)]
pub struct Router {
    identity: IdentityStore,
    subscriptions: SubscriptionRegistry,
    log: MessageLog,
    config: RouterConfig,
}

impl Router {
    /// Create a router over the given components.
    #[must_use]
    pub fn new(
        identity: IdentityStore,
        subscriptions: SubscriptionRegistry,
        log: MessageLog,
        config: RouterConfig,
    ) -> Self {
        info!("Creating router with config: {:?}", config);
        Self {
            identity,
            subscriptions,
            log,
            config,
        }
    }

    /// Publish `content` from `sender_id` to `target`.
    ///
    /// Direct targets must name an existing client and always report one
    /// delivery. Topic targets need no prior state and report the number of
    /// subscriptions on the topic at this moment.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] for an unknown direct recipient and
    /// [`RelayError::Malformed`] for an invalid target or oversized content.
    /// Nothing is logged in either case.
    pub fn publish(
        &self,
        sender_id: &str,
        target: &str,
        content: String,
        parent_id: Option<MessageId>,
    ) -> Result<Publication, RelayError> {
        validate_channel_name(target).map_err(|e| RelayError::Malformed(e.to_string()))?;
        self.check_content(&content)?;

        let target = Target::classify(target);
        if let Target::Direct(recipient) = &target {
            if !self.identity.exists(recipient)? {
                warn!(sender = %sender_id, recipient = %recipient, "Direct recipient not found");
                return Err(RelayError::NotFound);
            }
        }

        let message = self
            .log
            .append(target.channel(), sender_id, content, parent_id)?;

        let delivered_to = match &target {
            Target::Direct(_) => 1,
            Target::Topic(channel) => self.subscriptions.subscriber_count(channel)?,
        };

        debug!(
            sender = %sender_id,
            target = %target,
            id = %message.id,
            recipients = delivered_to,
            "Published"
        );

        Ok(Publication {
            id: message.id,
            delivered_to,
        })
    }

    /// Accept a message from a party without a bearer token.
    ///
    /// The caller proves itself with the target client's shared secret; the
    /// message is always direct to that client and recorded as sent by it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Forbidden`] when the secret does not match and
    /// [`RelayError::Malformed`] for oversized content.
    pub fn ingest(
        &self,
        client_id: &str,
        secret: &str,
        content: String,
    ) -> Result<MessageId, RelayError> {
        if !self.identity.authenticate(client_id, secret)? {
            warn!(client = %client_id, "External ingestion rejected");
            return Err(RelayError::Forbidden);
        }
        self.check_content(&content)?;

        let message = self.log.append(client_id, client_id, content, None)?;
        debug!(client = %client_id, id = %message.id, "Ingested external message");
        Ok(message.id)
    }

    fn check_content(&self, content: &str) -> Result<(), RelayError> {
        if content.len() > self.config.max_content_size {
            return Err(RelayError::Malformed(format!(
                "content exceeds {} bytes",
                self.config.max_content_size
            )));
        }
        Ok(())
    }
}
