//! In-process duplex used by the runner tests.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::{FutureExt, Sink, Stream, StreamExt};
use serde_json::Value;

use crate::transport::JsonFramed;

pub struct Wire {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<Result<String, String>>,
}

impl Sink<String> for Wire {
    type Error = mpsc::SendError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.tx).poll_ready(cx)
    }

    fn start_send(mut self: Pin<&mut Self>, item: String) -> Result<(), Self::Error> {
        Pin::new(&mut self.tx).start_send(item)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.tx).poll_flush(cx)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.tx).poll_close(cx)
    }
}

impl Stream for Wire {
    type Item = Result<String, String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}

/// The sandbox end of a `Wire`.
pub struct Peer {
    tx: mpsc::UnboundedSender<Result<String, String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Peer {
    pub fn send(&self, frame: Value) {
        self.send_raw(&frame.to_string());
    }

    pub fn send_raw(&self, frame: &str) {
        self.tx.unbounded_send(Ok(frame.to_string())).unwrap();
    }

    pub fn fail(&self, reason: &str) {
        self.tx.unbounded_send(Err(reason.to_string())).unwrap();
    }

    pub async fn next_frame(&mut self) -> Value {
        let frame = self.rx.next().await.expect("client closed the wire");
        serde_json::from_str(&frame).unwrap()
    }

    /// A frame the client already sent, without waiting for one.
    pub fn sent_frame(&mut self) -> Option<Value> {
        match self.rx.next().now_or_never() {
            Some(Some(frame)) => Some(serde_json::from_str(&frame).unwrap()),
            _ => None,
        }
    }
}

pub fn wire() -> (JsonFramed<Wire>, Peer) {
    let (client_tx, client_rx) = mpsc::unbounded();
    let (server_tx, server_rx) = mpsc::unbounded();
    (
        JsonFramed::new(Wire {
            tx: client_tx,
            rx: server_rx,
        }),
        Peer {
            tx: server_tx,
            rx: client_rx,
        },
    )
}
