use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{DlqEnvelope, DlqErrorCode, MessageEnvelope, MessageProperties};
use tracing::{debug, error, info, warn};

use crate::channel::{Binding, Delivery, DeliveryHandler, Disposition, MessageChannel, Subscription};
use crate::error::MqError;
use crate::queue::{BroccoliError, BrokerMessage, MqQueue};

/// [`MessageChannel`] over a broccoli (Redis) queue.
///
/// Redis has no exchanges, so every exchange/routing key pair maps to the
/// topic `"{exchange}.{routing_key}"`. Message properties travel inside a
/// [`MessageEnvelope`]. A negative acknowledgement with requeue hands the
/// message back to broccoli's retry policy; without requeue the message is
/// forwarded to the dead letter topic and acknowledged.
pub struct BroccoliChannel {
    queue: Arc<MqQueue>,
    dlq_topic: String,
    concurrency: Option<usize>,
    subscribed: AtomicBool,
}

impl BroccoliChannel {
    pub fn new(queue: Arc<MqQueue>, dlq_topic: impl Into<String>) -> Self {
        Self {
            queue,
            dlq_topic: dlq_topic.into(),
            concurrency: None,
            subscribed: AtomicBool::new(false),
        }
    }

    /// Number of deliveries handled in parallel. Defaults to broccoli's own.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn topic(exchange: &str, routing_key: &str) -> String {
        format!("{exchange}.{routing_key}")
    }
}

#[async_trait]
impl MessageChannel for BroccoliChannel {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: serde_json::Value,
        properties: MessageProperties,
    ) -> Result<(), MqError> {
        let topic = Self::topic(exchange, routing_key);
        let envelope = MessageEnvelope {
            properties,
            routing_key: routing_key.to_string(),
            payload,
        };

        self.queue.publish(&topic, None, &envelope, None).await?;

        debug!(
            topic = %topic,
            message_id = %envelope.properties.message_id,
            message_type = %envelope.properties.message_type,
            "Published message"
        );
        Ok(())
    }

    async fn subscribe(
        &self,
        handler: Arc<dyn DeliveryHandler>,
        binding: Binding,
    ) -> Result<Subscription, MqError> {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Err(MqError::AlreadySubscribed);
        }

        let queue = Arc::clone(&self.queue);
        let topic = Self::topic(&binding.exchange, &binding.routing_key);
        let dlq_topic = self.dlq_topic.clone();
        let concurrency = self.concurrency;

        let handle = tokio::spawn(async move {
            info!(topic = %topic, queue = %binding.queue, "Starting consumer");

            let mq_for_handler = Arc::clone(&queue);
            let consume_topic = topic.clone();
            let result = queue
                .process_messages(
                    &topic,
                    concurrency,
                    None,
                    move |message: BrokerMessage<serde_json::Value>| {
                        let mq = Arc::clone(&mq_for_handler);
                        let handler = Arc::clone(&handler);
                        let topic = consume_topic.clone();
                        let dlq_topic = dlq_topic.clone();
                        async move {
                            dispatch(message.payload, &mq, &topic, &dlq_topic, handler.as_ref())
                                .await
                        }
                    },
                )
                .await;

            if let Err(e) = result {
                error!(topic = %topic, error = %e, "Consumer stopped unexpectedly");
            }
        });

        Ok(Subscription::new(handle))
    }
}

async fn dispatch(
    raw: serde_json::Value,
    mq: &MqQueue,
    topic: &str,
    dlq_topic: &str,
    handler: &dyn DeliveryHandler,
) -> Result<(), BroccoliError> {
    let envelope: MessageEnvelope = match serde_json::from_value(raw.clone()) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(topic = %topic, error = %e, "Failed to read message envelope");
            let dead = DlqEnvelope {
                properties: None,
                topic: topic.to_string(),
                payload: raw,
                error_code: DlqErrorCode::MalformedEnvelope,
                error_message: e.to_string(),
            };
            return dead_letter(mq, dlq_topic, &dead).await;
        }
    };

    let delivery = Delivery {
        properties: envelope.properties,
        routing_key: envelope.routing_key,
        payload: envelope.payload,
    };
    let message_id = delivery.properties.message_id.clone();

    match handler.handle(delivery.clone()).await {
        Disposition::Ack => Ok(()),
        Disposition::Nack { requeue: true } => {
            warn!(topic = %topic, message_id = %message_id, "Message requeued by consumer");
            Err(BroccoliError::Job(format!(
                "Message {} requeued by consumer",
                message_id
            )))
        }
        Disposition::Nack { requeue: false } => {
            warn!(topic = %topic, message_id = %message_id, "Message rejected by consumer");
            let dead = DlqEnvelope {
                properties: Some(delivery.properties),
                topic: topic.to_string(),
                payload: delivery.payload,
                error_code: DlqErrorCode::Rejected,
                error_message: format!("Message {} rejected by consumer", message_id),
            };
            dead_letter(mq, dlq_topic, &dead).await
        }
    }
}

async fn dead_letter(
    mq: &MqQueue,
    dlq_topic: &str,
    envelope: &DlqEnvelope,
) -> Result<(), BroccoliError> {
    if let Err(e) = mq.publish(dlq_topic, None, envelope, None).await {
        error!(error = %e, "Failed to publish to DLQ");
        return Err(BroccoliError::Publish(format!(
            "Failed to publish to DLQ: {}",
            e
        )));
    }
    Ok(())
}
