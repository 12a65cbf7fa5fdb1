//! Client identities and shared secrets.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::{now_millis, Timestamp};
use crate::error::StoreError;
use crate::store::{ClientRecord, Store};

/// A unique client identifier.
pub type ClientId = String;

/// Credentials handed out at registration.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: ClientId,
    /// Shared secret for external ingestion.
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Registers clients and answers identity questions.
#[derive(Clone)]
pub struct IdentityStore {
    store: Arc<dyn Store>,
}

impl IdentityStore {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a client with a fresh id and secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the insert.
    pub fn register(&self) -> Result<Credentials, StoreError> {
        let credentials = Credentials {
            id: Uuid::new_v4().to_string(),
            secret: Uuid::new_v4().to_string(),
        };
        self.store.insert_client(&ClientRecord {
            id: credentials.id.clone(),
            secret: credentials.secret.clone(),
            last_seen: now_millis(),
        })?;

        info!(client = %credentials.id, "Registered client");
        Ok(credentials)
    }

    /// Whether a client with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.store.client(id)?.is_some())
    }

    /// Check a shared secret. Unknown ids never authenticate.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub fn authenticate(&self, id: &str, secret: &str) -> Result<bool, StoreError> {
        let matched = self
            .store
            .client(id)?
            .is_some_and(|client| client.secret == secret);
        if !matched {
            debug!(client = %id, "Shared secret rejected");
        }
        Ok(matched)
    }

    /// Record that the client was just seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the store update fails.
    pub fn touch(&self, id: &str, now: Timestamp) -> Result<(), StoreError> {
        self.store.touch_client(id, now)
    }

    /// When the client last polled (or registered).
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub fn last_seen(&self, id: &str) -> Result<Option<Timestamp>, StoreError> {
        Ok(self.store.client(id)?.map(|c| c.last_seen))
    }
}
