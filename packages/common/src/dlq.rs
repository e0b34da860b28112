use serde::{Deserialize, Serialize};

use crate::mq::MessageProperties;

/// Error codes for dead-lettered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DlqErrorCode {
    /// The transport frame is not a message envelope.
    MalformedEnvelope,
    /// The consumer refused the message without asking for redelivery.
    Rejected,
}

impl DlqErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope => "MALFORMED_ENVELOPE",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for DlqErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Envelope for transporting discarded messages to the dead letter queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEnvelope {
    /// Properties of the discarded message.
    ///
    /// `None` when the transport frame could not even be read as an envelope.
    pub properties: Option<MessageProperties>,
    /// Topic the message was consumed from.
    pub topic: String,
    /// Full message payload, untouched.
    pub payload: serde_json::Value,
    /// Machine-readable error code.
    pub error_code: DlqErrorCode,
    /// Human-readable error message.
    pub error_message: String,
}
