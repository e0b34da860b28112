use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("A handler is already subscribed on this channel")]
    AlreadySubscribed,

    #[error("Channel closed")]
    Closed,

    #[error("{0}")]
    Internal(String),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Internal(e.to_string())
    }
}
