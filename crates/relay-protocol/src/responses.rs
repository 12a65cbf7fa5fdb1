//! Response bodies.

use serde::{Deserialize, Serialize};

/// Returned by `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// New client id.
    pub id: String,
    /// Shared secret for external ingestion.
    pub secret: String,
    /// Bearer token bound to `id`.
    pub token: String,
}

/// Returned by `POST /publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Id of the logged message.
    pub id: String,
    /// Informational fan-out count computed at publish time.
    #[serde(rename = "deliveredTo")]
    pub delivered_to: usize,
}

/// Returned by `POST /subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

impl AckResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Returned by `POST /incoming`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub id: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// A message as returned by `GET /poll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub id: String,
    /// Client id for direct messages, topic name otherwise.
    pub channel: String,
    pub sender_id: String,
    pub content: String,
    /// Milliseconds since the Unix epoch. Pass the largest seen value back as
    /// `since` to page forward.
    pub timestamp: u64,
    /// Always serialized, `null` when absent.
    pub parent_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_response_uses_camel_case_count() {
        let body = PublishResponse {
            id: "m-1".into(),
            delivered_to: 3,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"id": "m-1", "deliveredTo": 3})
        );
    }

    #[test]
    fn test_message_body_keeps_null_parent() {
        let body = MessageBody {
            id: "m-1".into(),
            channel: "news/general".into(),
            sender_id: "c-1".into(),
            content: "update".into(),
            timestamp: 42,
            parent_id: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["parent_id"], serde_json::Value::Null);
        assert_eq!(value["timestamp"], 42);
    }

    #[test]
    fn test_ack_response() {
        assert_eq!(
            serde_json::to_string(&AckResponse::ok()).unwrap(),
            r#"{"ok":true}"#
        );
    }
}
