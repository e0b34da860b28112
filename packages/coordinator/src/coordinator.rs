use std::sync::Arc;

use chrono::Duration;
use mq::{Binding, MessageChannel, MqError, Subscription};
use tracing::info;

use crate::config::AppConfig;
use crate::consumers::JudgeResultHandler;
use crate::service::SubmissionService;
use crate::store::JudgeStore;

/// Wires the submission service and the result consumer around one store
/// and one message channel.
///
/// All state lives in the store, so any number of instances may serve the
/// API while only the ones with the consumer enabled apply results.
pub struct Coordinator {
    submissions: Arc<SubmissionService>,
    handler: Arc<JudgeResultHandler>,
    channel: Arc<dyn MessageChannel>,
    binding: Binding,
    enable_result_consumer: bool,
}

impl Coordinator {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn JudgeStore>,
        channel: Arc<dyn MessageChannel>,
        enable_result_consumer: bool,
    ) -> Self {
        let ttl = i64::try_from(config.submission.test_result_ttl_secs).unwrap_or(i64::MAX);
        let submissions = Arc::new(SubmissionService::new(
            Arc::clone(&store),
            Arc::clone(&channel),
            config.mq.clone(),
            Duration::try_seconds(ttl).unwrap_or(Duration::MAX),
        ));
        let handler = Arc::new(JudgeResultHandler::new(store));
        let binding = Binding::new(
            &config.mq.exchange,
            &config.mq.result_key,
            &config.mq.result_queue,
        );

        Self {
            submissions,
            handler,
            channel,
            binding,
            enable_result_consumer,
        }
    }

    pub fn submissions(&self) -> Arc<SubmissionService> {
        Arc::clone(&self.submissions)
    }

    /// Subscribe the result handler when this instance consumes results.
    pub async fn start(&self) -> Result<Option<Subscription>, MqError> {
        if !self.enable_result_consumer {
            info!("Result consumer disabled on this instance");
            return Ok(None);
        }

        let subscription = self
            .channel
            .subscribe(self.handler.clone(), self.binding.clone())
            .await?;
        info!(
            exchange = %self.binding.exchange,
            routing_key = %self.binding.routing_key,
            queue = %self.binding.queue,
            "Result consumer started"
        );
        Ok(Some(subscription))
    }
}
