//! The relay facade.

use std::sync::Arc;

use tracing::debug;

use crate::command::{Command, Outcome};
use crate::error::RelayError;
use crate::identity::IdentityStore;
use crate::log::MessageLog;
use crate::poll::PollEngine;
use crate::router::{Router, RouterConfig};
use crate::store::Store;
use crate::subscription::SubscriptionRegistry;

/// All relay components over one shared store.
#[derive(Clone)]
pub struct Relay {
    identity: IdentityStore,
    subscriptions: SubscriptionRegistry,
    log: MessageLog,
    router: Router,
    poller: PollEngine,
}

impl Relay {
    /// Create a relay with default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, RouterConfig::default())
    }

    /// Create a relay with custom router configuration.
    #[must_use]
    pub fn with_config(store: Arc<dyn Store>, config: RouterConfig) -> Self {
        let identity = IdentityStore::new(store.clone());
        let subscriptions = SubscriptionRegistry::new(store.clone());
        let log = MessageLog::new(store);
        let router = Router::new(
            identity.clone(),
            subscriptions.clone(),
            log.clone(),
            config,
        );
        let poller = PollEngine::new(identity.clone(), subscriptions.clone(), log.clone());
        Self {
            identity,
            subscriptions,
            log,
            router,
            poller,
        }
    }

    /// Run one command.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying component reports; see [`RelayError`].
    pub fn execute(&self, command: Command) -> Result<Outcome, RelayError> {
        debug!(command = command.name(), "Executing");
        match command {
            Command::Register => Ok(Outcome::Registered(self.identity.register()?)),
            Command::Publish {
                sender,
                channel,
                content,
                parent_id,
            } => Ok(Outcome::Published(
                self.router.publish(&sender, &channel, content, parent_id)?,
            )),
            Command::Subscribe { client, channel } => {
                self.subscriptions.subscribe(&client, &channel)?;
                Ok(Outcome::Subscribed)
            }
            Command::Poll { client, since } => {
                Ok(Outcome::Messages(self.poller.poll(&client, since)?))
            }
            Command::ExternalIngest {
                client_id,
                secret,
                content,
            } => Ok(Outcome::Ingested(
                self.router.ingest(&client_id, &secret, content)?,
            )),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    #[must_use]
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn poller(&self) -> &PollEngine {
        &self.poller
    }
}
