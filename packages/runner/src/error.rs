use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Input queue is full ({0} lines waiting)")]
    InputQueueFull(usize),
}
