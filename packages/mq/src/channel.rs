//! Transport-neutral messaging surface used by the coordinator.
//!
//! A [`MessageChannel`] publishes payloads under an exchange and routing key
//! and hands inbound messages to exactly one [`DeliveryHandler`]. The handler
//! decides the fate of every delivery through its [`Disposition`].

use std::sync::Arc;

use async_trait::async_trait;
use common::MessageProperties;
use tokio::task::JoinHandle;

use crate::error::MqError;

/// Where a subscription reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub exchange: String,
    pub routing_key: String,
    /// Durable queue name. Messages published while nobody consumes stay here.
    pub queue: String,
}

impl Binding {
    pub fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            queue: queue.into(),
        }
    }
}

/// One inbound message.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub properties: MessageProperties,
    pub routing_key: String,
    pub payload: serde_json::Value,
}

/// Outcome a handler reports for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    /// `requeue: true` asks for redelivery, `false` discards the message
    /// into the dead letter queue.
    Nack { requeue: bool },
}

#[async_trait]
pub trait DeliveryHandler: Send + Sync + 'static {
    async fn handle(&self, delivery: Delivery) -> Disposition;
}

#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: serde_json::Value,
        properties: MessageProperties,
    ) -> Result<(), MqError>;

    /// Start consuming `binding` with `handler`. A channel accepts a single
    /// subscription; a second call fails with [`MqError::AlreadySubscribed`].
    async fn subscribe(
        &self,
        handler: Arc<dyn DeliveryHandler>,
        binding: Binding,
    ) -> Result<Subscription, MqError>;
}

/// Handle to a running consumer task.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop consuming. Messages not yet handled stay on the queue.
    pub fn cancel(self) {
        self.handle.abort();
    }
}
