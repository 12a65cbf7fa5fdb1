//! Cursor-based polling.
//!
//! Filtering uses only the caller's `since`. The server also stamps
//! `last_seen` and each subscription's `last_polled` on every poll, but those
//! are liveness telemetry and never narrow what a poll returns.

use tracing::debug;

use crate::clock::{now_millis, Timestamp};
use crate::error::StoreError;
use crate::identity::IdentityStore;
use crate::log::MessageLog;
use crate::message::Message;
use crate::subscription::SubscriptionRegistry;

/// Computes what a client has not yet seen.
#[derive(Clone)]
pub struct PollEngine {
    identity: IdentityStore,
    subscriptions: SubscriptionRegistry,
    log: MessageLog,
}

impl PollEngine {
    #[must_use]
    pub fn new(
        identity: IdentityStore,
        subscriptions: SubscriptionRegistry,
        log: MessageLog,
    ) -> Self {
        Self {
            identity,
            subscriptions,
            log,
        }
    }

    /// Messages addressed to `client_id` or to its subscribed channels with a
    /// timestamp after `since` (0 when omitted), oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn poll(
        &self,
        client_id: &str,
        since: Option<Timestamp>,
    ) -> Result<Vec<Message>, StoreError> {
        let since = since.unwrap_or(0);
        let channels = self.subscriptions.subscribed_channels(client_id)?;
        let messages = self.log.query(client_id, &channels, since)?;

        let now = now_millis();
        self.identity.touch(client_id, now)?;
        self.subscriptions.advance_cursor(client_id, now)?;

        debug!(
            client = %client_id,
            since,
            channels = channels.len(),
            messages = messages.len(),
            "Polled"
        );
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Router, RouterConfig};
    use crate::store::{MemoryStore, Store};
    use std::sync::Arc;

    struct Fixture {
        identity: IdentityStore,
        subscriptions: SubscriptionRegistry,
        router: Router,
        poller: PollEngine,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let identity = IdentityStore::new(store.clone());
        let subscriptions = SubscriptionRegistry::new(store.clone());
        let log = MessageLog::new(store);
        Fixture {
            router: Router::new(
                identity.clone(),
                subscriptions.clone(),
                log.clone(),
                RouterConfig::default(),
            ),
            poller: PollEngine::new(identity.clone(), subscriptions.clone(), log),
            identity,
            subscriptions,
        }
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_first_poll_returns_full_history() {
        let f = fixture();
        let a = f.identity.register().unwrap();
        let b = f.identity.register().unwrap();
        f.subscriptions.subscribe(&b.id, "news/general").unwrap();

        f.router.publish(&a.id, &b.id, "one".into(), None).unwrap();
        f.router
            .publish(&a.id, "news/general", "two".into(), None)
            .unwrap();
        f.router.publish(&a.id, &a.id, "self".into(), None).unwrap();

        let seen = f.poller.poll(&b.id, None).unwrap();
        assert_eq!(contents(&seen), ["one", "two"]);
    }

    #[test]
    fn test_repeated_poll_with_same_since_is_identical() {
        let f = fixture();
        let a = f.identity.register().unwrap();
        let b = f.identity.register().unwrap();
        f.router.publish(&a.id, &b.id, "hello".into(), None).unwrap();

        let first = f.poller.poll(&b.id, Some(0)).unwrap();
        let second = f.poller.poll(&b.id, Some(0)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_since_pages_forward() {
        let f = fixture();
        let a = f.identity.register().unwrap();
        let b = f.identity.register().unwrap();
        f.router.publish(&a.id, &b.id, "old".into(), None).unwrap();

        let seen = f.poller.poll(&b.id, None).unwrap();
        let cursor = seen.last().unwrap().timestamp;
        assert!(f.poller.poll(&b.id, Some(cursor)).unwrap().is_empty());
    }

    #[test]
    fn test_poll_advances_telemetry_only() {
        let f = fixture();
        let a = f.identity.register().unwrap();
        let b = f.identity.register().unwrap();
        f.subscriptions.subscribe(&b.id, "news/general").unwrap();
        f.router
            .publish(&a.id, "news/general", "update".into(), None)
            .unwrap();

        // Pretend the previous poll happened far in the future.
        f.identity.touch(&b.id, u64::MAX - 1).unwrap();
        f.subscriptions.advance_cursor(&b.id, u64::MAX - 1).unwrap();

        let seen = f.poller.poll(&b.id, None).unwrap();
        assert_eq!(contents(&seen), ["update"]);

        let seen_at = f.identity.last_seen(&b.id).unwrap().unwrap();
        assert!(seen_at < u64::MAX - 1);
        assert_eq!(
            f.subscriptions.last_polled(&b.id, "news/general").unwrap(),
            Some(seen_at)
        );
    }

    #[test]
    fn test_empty_poll_still_advances() {
        let f = fixture();
        let b = f.identity.register().unwrap();
        f.identity.touch(&b.id, 1).unwrap();

        assert!(f.poller.poll(&b.id, None).unwrap().is_empty());
        assert!(f.identity.last_seen(&b.id).unwrap().unwrap() > 1);
    }

    #[test]
    fn test_unsubscribed_client_sees_nothing_from_topic() {
        let f = fixture();
        let a = f.identity.register().unwrap();
        let c = f.identity.register().unwrap();
        f.router
            .publish(&a.id, "news/general", "update".into(), None)
            .unwrap();

        assert!(f.poller.poll(&c.id, None).unwrap().is_empty());
    }
}
