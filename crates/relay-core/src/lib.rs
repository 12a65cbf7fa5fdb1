//! # relay-core
//!
//! Delivery and subscription model for the relay.
//!
//! Clients publish either directly to another client or to a topic channel,
//! and fetch what they have not yet seen by polling with a timestamp cursor.
//!
//! - **Identity** - client ids and shared secrets
//! - **Subscriptions** - durable `(client, channel)` interest with telemetry cursors
//! - **Log** - append-only message record, the only source of delivery
//! - **Router** - direct/topic classification and fan-out counting
//! - **Poll** - cursor-based retrieval
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Command   │────▶│   Router    │────▶│ Message Log │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │                   ▲
//!        ▼                   ▼                   │
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Poll Engine │────▶│Subscriptions│     │  Identity   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! Every component shares one [`Store`] backend.

pub mod channel;
pub mod clock;
pub mod command;
pub mod error;
pub mod identity;
pub mod log;
pub mod message;
pub mod poll;
pub mod relay;
pub mod router;
pub mod store;
pub mod subscription;

pub use channel::{ChannelId, Target};
pub use clock::{LogPosition, Timestamp};
pub use command::{Command, Outcome};
pub use error::{RelayError, StoreError};
pub use identity::{ClientId, Credentials, IdentityStore};
pub use log::MessageLog;
pub use message::{Message, MessageDraft, MessageId, Publication};
pub use poll::PollEngine;
pub use relay::Relay;
pub use router::{Router, RouterConfig};
pub use store::{MemoryStore, SledStore, Store};
pub use subscription::SubscriptionRegistry;
