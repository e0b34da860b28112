use std::fmt::Display;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};

use crate::error::RunnerError;
use crate::protocol::{ClientMessage, ServerMessage};

/// Duplex channel to an execution sandbox.
///
/// `recv` must be cancel safe: the session polls it inside `select!`.
#[async_trait]
pub trait RunTransport: Send {
    async fn send(&mut self, message: &ClientMessage) -> Result<(), RunnerError>;

    /// `None` once the peer closed the channel. A frame that is not a known
    /// server message yields `RunnerError::Serialization`.
    async fn recv(&mut self) -> Option<Result<ServerMessage, RunnerError>>;

    async fn close(&mut self) -> Result<(), RunnerError>;
}

/// JSON text frames over any string sink/stream pair, e.g. a WebSocket split
/// into text messages.
pub struct JsonFramed<S> {
    inner: S,
}

impl<S> JsonFramed<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S, E> RunTransport for JsonFramed<S>
where
    S: Sink<String> + Stream<Item = Result<String, E>> + Unpin + Send,
    <S as Sink<String>>::Error: Display,
    E: Display,
{
    async fn send(&mut self, message: &ClientMessage) -> Result<(), RunnerError> {
        let frame = serde_json::to_string(message)?;
        self.inner
            .send(frame)
            .await
            .map_err(|e| RunnerError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<ServerMessage, RunnerError>> {
        let frame = match self.inner.next().await? {
            Ok(frame) => frame,
            Err(e) => return Some(Err(RunnerError::Transport(e.to_string()))),
        };
        Some(serde_json::from_str(&frame).map_err(RunnerError::from))
    }

    async fn close(&mut self) -> Result<(), RunnerError> {
        self.inner
            .close()
            .await
            .map_err(|e| RunnerError::Transport(e.to_string()))
    }
}
