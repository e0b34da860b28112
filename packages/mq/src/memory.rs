use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::MessageProperties;
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::{debug, warn};

use crate::channel::{
    Binding, Delivery, DeliveryHandler, Disposition, MessageChannel, Subscription,
};
use crate::error::MqError;

const DEFAULT_MAX_REDELIVERIES: u32 = 5;

/// A message recorded by [`MemoryChannel::publish`].
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub properties: MessageProperties,
    pub payload: serde_json::Value,
}

/// In-process [`MessageChannel`] for tests and single-node setups.
///
/// Every publish is recorded. Messages published on the subscribed
/// exchange/routing key are delivered to the handler in order. Requeued
/// messages go to the back of the queue with a bumped redelivery count until
/// `max_redeliveries` is reached, after which they are dead-lettered.
#[derive(Clone)]
pub struct MemoryChannel {
    inner: Arc<Inner>,
}

struct Inner {
    published: Mutex<Vec<PublishedMessage>>,
    dead_letters: Mutex<Vec<Delivery>>,
    dispositions: Mutex<Vec<(String, Disposition)>>,
    route: Mutex<Option<Route>>,
    settled: Notify,
    subscribed: AtomicBool,
    max_redeliveries: u32,
    /// Publishes left before the broker "goes away".
    publish_budget: AtomicUsize,
}

struct Route {
    exchange: String,
    routing_key: String,
    sender: mpsc::UnboundedSender<Delivery>,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::with_max_redeliveries(DEFAULT_MAX_REDELIVERIES)
    }

    pub fn with_max_redeliveries(max_redeliveries: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                published: Mutex::new(Vec::new()),
                dead_letters: Mutex::new(Vec::new()),
                dispositions: Mutex::new(Vec::new()),
                route: Mutex::new(None),
                settled: Notify::new(),
                subscribed: AtomicBool::new(false),
                max_redeliveries,
                publish_budget: AtomicUsize::new(usize::MAX),
            }),
        }
    }

    /// Let the next `count` publishes through, then fail every publish with
    /// [`MqError::Internal`] as if the broker were unreachable.
    pub fn fail_publishes_after(&self, count: usize) {
        self.inner.publish_budget.store(count, Ordering::SeqCst);
    }

    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.inner.published.lock().await.clone()
    }

    pub async fn published_to(&self, routing_key: &str) -> Vec<PublishedMessage> {
        self.inner
            .published
            .lock()
            .await
            .iter()
            .filter(|m| m.routing_key == routing_key)
            .cloned()
            .collect()
    }

    pub async fn dead_letters(&self) -> Vec<Delivery> {
        self.inner.dead_letters.lock().await.clone()
    }

    /// Hand `delivery` straight to the subscribed handler, bypassing routing.
    pub async fn deliver(&self, delivery: Delivery) -> Result<(), MqError> {
        let route = self.inner.route.lock().await;
        let route = route.as_ref().ok_or(MqError::Closed)?;
        route.sender.send(delivery).map_err(|_| MqError::Closed)
    }

    /// Every disposition the subscribed handler returned, by message id.
    pub async fn dispositions(&self) -> Vec<(String, Disposition)> {
        self.inner.dispositions.lock().await.clone()
    }

    /// Wait until the handler has returned at least `count` dispositions.
    pub async fn wait_for_dispositions(&self, count: usize) -> Vec<(String, Disposition)> {
        loop {
            let notified = self.inner.settled.notified();
            {
                let log = self.inner.dispositions.lock().await;
                if log.len() >= count {
                    return log.clone();
                }
            }
            notified.await;
        }
    }
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: serde_json::Value,
        properties: MessageProperties,
    ) -> Result<(), MqError> {
        let admitted = self
            .inner
            .publish_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !admitted {
            return Err(MqError::Internal("broker unavailable".into()));
        }

        self.inner.published.lock().await.push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            properties: properties.clone(),
            payload: payload.clone(),
        });

        let route = self.inner.route.lock().await;
        if let Some(route) = route.as_ref() {
            if route.exchange == exchange && route.routing_key == routing_key {
                let delivery = Delivery {
                    properties,
                    routing_key: routing_key.to_string(),
                    payload,
                };
                route.sender.send(delivery).map_err(|_| MqError::Closed)?;
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        handler: Arc<dyn DeliveryHandler>,
        binding: Binding,
    ) -> Result<Subscription, MqError> {
        if self.inner.subscribed.swap(true, Ordering::SeqCst) {
            return Err(MqError::AlreadySubscribed);
        }

        let (sender, mut receiver) = mpsc::unbounded_channel();
        *self.inner.route.lock().await = Some(Route {
            exchange: binding.exchange,
            routing_key: binding.routing_key,
            sender: sender.clone(),
        });

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            while let Some(delivery) = receiver.recv().await {
                let message_id = delivery.properties.message_id.clone();
                let disposition = handler.handle(delivery.clone()).await;
                debug!(message_id = %message_id, ?disposition, "Delivery handled");

                match disposition {
                    Disposition::Ack => {}
                    Disposition::Nack { requeue: true }
                        if delivery.properties.redelivery_count < inner.max_redeliveries =>
                    {
                        let mut again = delivery;
                        again.properties.redelivery_count += 1;
                        if sender.send(again).is_err() {
                            break;
                        }
                    }
                    Disposition::Nack { requeue } => {
                        if requeue {
                            warn!(
                                message_id = %message_id,
                                "Redelivery limit reached, dead-lettering"
                            );
                        }
                        inner.dead_letters.lock().await.push(delivery);
                    }
                }

                inner.dispositions.lock().await.push((message_id, disposition));
                inner.settled.notify_waiters();
            }
        });

        Ok(Subscription::new(handle))
    }
}
