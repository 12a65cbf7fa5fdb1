//! # relay-protocol
//!
//! Wire definitions for the relay HTTP API.
//!
//! Request bodies arrive loosely typed (every field optional) and are checked
//! into validated values before they reach the core. Response bodies are the
//! JSON shapes returned to callers.
//!
//! ## Example
//!
//! ```rust
//! use relay_protocol::PublishRequest;
//!
//! let raw: PublishRequest =
//!     serde_json::from_str(r#"{"channel":"news/general","content":"update"}"#).unwrap();
//! let publish = raw.validate().unwrap();
//! assert_eq!(publish.channel, "news/general");
//! assert!(publish.parent_id.is_none());
//! ```

pub mod error;
pub mod requests;
pub mod responses;

pub use error::ProtocolError;
pub use requests::{
    IngestRequest, PollQuery, Publish, PublishRequest, Subscribe, SubscribeRequest, ValidIngest,
};
pub use responses::{
    AckResponse, ErrorResponse, IngestResponse, MessageBody, PublishResponse, RegisterResponse,
};
