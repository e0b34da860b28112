use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Kind of work a message asks the judge to do. Sent as the transport `type`
/// property and echoed back on results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Graded submission; results are persisted.
    Judge,
    /// Test run against public test cases; results are short-lived.
    Run,
    /// Test run against input supplied by the user; results are short-lived.
    UserTest,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Judge => "Judge",
            Self::Run => "Run",
            Self::UserTest => "UserTest",
        }
    }

    /// Graded submissions overtake test runs.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Judge => 3,
            Self::Run | Self::UserTest => 2,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Judge" => Ok(Self::Judge),
            "Run" => Ok(Self::Run),
            "UserTest" => Ok(Self::UserTest),
            _ => Err(format!("Unknown message type '{}'", s)),
        }
    }
}

/// Transport-level properties of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageProperties {
    /// Correlation key. For graded submissions this is the result row id.
    pub message_id: String,
    pub message_type: String,
    /// Survives a broker restart.
    pub persistent: bool,
    pub priority: u8,
    pub timestamp: i64,
    /// How many times the broker handed this message out again after a
    /// negative acknowledgement.
    #[serde(default)]
    pub redelivery_count: u32,
}

impl MessageProperties {
    pub fn new(message_id: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            message_id: message_id.into(),
            message_type: kind.as_str().to_string(),
            persistent: true,
            priority: kind.priority(),
            timestamp: Utc::now().timestamp_millis(),
            redelivery_count: 0,
        }
    }

    pub fn kind(&self) -> Option<MessageKind> {
        self.message_type.parse().ok()
    }
}

/// Message envelope for transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub properties: MessageProperties,
    pub routing_key: String,
    pub payload: serde_json::Value,
}

impl MessageEnvelope {
    /// Create envelope from a serializable payload.
    pub fn new<T: Serialize>(
        payload: &T,
        routing_key: impl Into<String>,
        properties: MessageProperties,
    ) -> Result<Self, serde_json::Error> {
        let routing_key = routing_key.into();

        debug!(
            message_type = %properties.message_type,
            message_id = %properties.message_id,
            routing_key = %routing_key,
            "Creating message envelope"
        );

        Ok(Self {
            properties,
            routing_key,
            payload: serde_json::to_value(payload)?,
        })
    }
}
