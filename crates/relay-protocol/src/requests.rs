//! Request bodies.
//!
//! Every field is optional on the wire so that a missing field surfaces as a
//! [`ProtocolError`] instead of an opaque deserializer message. Call
//! `validate` to obtain the typed value.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

fn required(value: Option<String>, field: &'static str) -> Result<String, ProtocolError> {
    value.ok_or(ProtocolError::MissingField(field))
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, ProtocolError> {
    let value = required(value, field)?;
    if value.is_empty() {
        return Err(ProtocolError::InvalidField {
            field,
            reason: "must not be empty",
        });
    }
    Ok(value)
}

/// Body of `POST /publish`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Client id (direct) or topic name.
    pub channel: Option<String>,
    /// Opaque payload.
    pub content: Option<String>,
    /// Optional message this one replies to.
    pub parent_id: Option<String>,
}

/// A validated publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub channel: String,
    pub content: String,
    pub parent_id: Option<String>,
}

impl PublishRequest {
    /// Check the request shape.
    ///
    /// # Errors
    ///
    /// Returns an error if `channel` or `content` is missing.
    pub fn validate(self) -> Result<Publish, ProtocolError> {
        Ok(Publish {
            channel: non_empty(self.channel, "channel")?,
            content: required(self.content, "content")?,
            parent_id: self.parent_id,
        })
    }
}

/// Body of `POST /subscribe`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub channel: Option<String>,
}

/// A validated subscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    pub channel: String,
}

impl SubscribeRequest {
    /// Check the request shape.
    ///
    /// # Errors
    ///
    /// Returns an error if `channel` is missing or empty.
    pub fn validate(self) -> Result<Subscribe, ProtocolError> {
        Ok(Subscribe {
            channel: non_empty(self.channel, "channel")?,
        })
    }
}

/// Body of `POST /incoming`, used by parties holding a client's shared secret
/// instead of a bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub client_id: Option<String>,
    pub secret: Option<String>,
    pub content: Option<String>,
}

/// A validated external ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidIngest {
    pub client_id: String,
    pub secret: String,
    pub content: String,
}

impl IngestRequest {
    /// Check the request shape.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three fields is missing.
    pub fn validate(self) -> Result<ValidIngest, ProtocolError> {
        Ok(ValidIngest {
            client_id: non_empty(self.client_id, "client_id")?,
            secret: required(self.secret, "secret")?,
            content: required(self.content, "content")?,
        })
    }
}

/// Query string of `GET /poll`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollQuery {
    pub since: Option<String>,
}

impl PollQuery {
    /// The cursor in milliseconds. Missing or non-numeric values count as 0.
    ///
    /// Any decimal number is accepted (`1.7e12`, `1700000000000.5`) and
    /// floored; negatives clamp to 0 and values past `u64::MAX` saturate.
    #[must_use]
    pub fn since(&self) -> u64 {
        let value = self
            .since
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .unwrap_or(0.0);
        if value.is_nan() || value <= 0.0 {
            0
        } else {
            // `as` saturates at u64::MAX.
            value.floor() as u64
        }
    }
}
