use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{JudgerResponse, MessageFormatError, MessageKind};
use mq::{Delivery, DeliveryHandler, Disposition};
use tracing::{debug, error, info, warn};

use crate::service::RunKey;
use crate::store::{JudgeStore, ResultUpdate, TestRunKind};

/// Applies judge results from the result queue.
///
/// Every delivery ends in an explicit disposition: malformed messages are
/// discarded, results for unknown rows or replaced runs are acknowledged and
/// dropped, and store failures are requeued.
pub struct JudgeResultHandler {
    store: Arc<dyn JudgeStore>,
}

const DISCARD: Disposition = Disposition::Nack { requeue: false };
const RETRY: Disposition = Disposition::Nack { requeue: true };

fn result_update(response: &JudgerResponse) -> ResultUpdate {
    let testcase = response.testcase_result();
    ResultUpdate {
        status: response.status(),
        cpu_time: testcase.map(|t| t.cpu_time),
        memory_usage: testcase.map(|t| t.memory),
        output: response.output(),
    }
}

impl JudgeResultHandler {
    pub fn new(store: Arc<dyn JudgeStore>) -> Self {
        Self { store }
    }

    async fn apply_judge(&self, delivery: Delivery) -> Disposition {
        let message_id = delivery.properties.message_id;
        let response = match JudgerResponse::parse(delivery.payload) {
            Ok(r) => r,
            Err(e) => {
                error!(message_id = %message_id, error = %e, "Discarding malformed judge result");
                return DISCARD;
            }
        };

        let result_id: i64 = match response.submission_result_id.parse() {
            Ok(id) => id,
            Err(_) => {
                let e = MessageFormatError::Field(format!(
                    "submissionResultId '{}' is not a result id",
                    response.submission_result_id
                ));
                error!(message_id = %message_id, error = %e, "Discarding malformed judge result");
                return DISCARD;
            }
        };
        if response.submission_result_id != message_id {
            warn!(
                result_id,
                message_id = %message_id,
                "Message id differs from payload id, applying to the payload's row"
            );
        }

        let update = result_update(&response);
        let status = update.status;
        match self.store.apply_result(result_id, update).await {
            Ok(true) => {
                info!(result_id, status = %status, "Applied judge result");
                Disposition::Ack
            }
            Ok(false) => {
                warn!(result_id, "Judge result for unknown submission result, dropping");
                Disposition::Ack
            }
            Err(e) => {
                error!(result_id, error = %e, "Failed to apply judge result, requeueing");
                RETRY
            }
        }
    }

    async fn apply_run(&self, delivery: Delivery, kind: TestRunKind) -> Disposition {
        let message_id = delivery.properties.message_id;
        let response = match JudgerResponse::parse(delivery.payload) {
            Ok(r) => r,
            Err(e) => {
                error!(
                    message_id = %message_id,
                    error = %e,
                    "Discarding malformed test-run result"
                );
                return DISCARD;
            }
        };

        let Ok(key) = response.submission_result_id.parse::<RunKey>() else {
            error!(
                message_id = %message_id,
                key = %response.submission_result_id,
                "Discarding test-run result with malformed key"
            );
            return DISCARD;
        };
        if response.submission_result_id != message_id {
            warn!(key = %key, message_id = %message_id, "Message id differs from payload key");
        }

        let update = result_update(&response);
        let status = update.status;
        let applied = self
            .store
            .apply_test_result(
                key.user_id,
                kind,
                &key.run_id,
                key.testcase_id,
                update,
                Utc::now(),
            )
            .await;
        match applied {
            Ok(true) => {
                debug!(key = %key, status = %status, "Recorded test-run result");
                Disposition::Ack
            }
            Ok(false) => {
                debug!(key = %key, "Test run expired or replaced, dropping result");
                Disposition::Ack
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to record test-run result, requeueing");
                RETRY
            }
        }
    }
}

#[async_trait]
impl DeliveryHandler for JudgeResultHandler {
    async fn handle(&self, delivery: Delivery) -> Disposition {
        match delivery.properties.kind() {
            Some(MessageKind::Judge) => self.apply_judge(delivery).await,
            Some(MessageKind::Run) => self.apply_run(delivery, TestRunKind::Public).await,
            Some(MessageKind::UserTest) => self.apply_run(delivery, TestRunKind::User).await,
            None => {
                error!(
                    message_id = %delivery.properties.message_id,
                    message_type = %delivery.properties.message_type,
                    "Discarding result with unknown message type"
                );
                DISCARD
            }
        }
    }
}
