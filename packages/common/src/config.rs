use serde::Deserialize;

/// App-level MQ configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Exchange shared by judge requests and results. Default: "judge.exchange".
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Routing key for judge requests, published here and consumed by the judge.
    /// Default: "judge.submission".
    #[serde(default = "default_submission_key")]
    pub submission_key: String,
    /// Routing key for judge results (judge publishes, server consumes). Default: "judge.result".
    #[serde(default = "default_result_key")]
    pub result_key: String,
    /// Durable queue the result consumer reads from. Default: "client.q.judge.result".
    #[serde(default = "default_result_queue")]
    pub result_queue: String,
    /// Queue receiving messages that were discarded without requeue. Default: "judge_dlq".
    #[serde(default = "default_dlq_queue_name")]
    pub dlq_queue_name: String,
}

fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_exchange() -> String {
    "judge.exchange".into()
}
fn default_submission_key() -> String {
    "judge.submission".into()
}
fn default_result_key() -> String {
    "judge.result".into()
}
fn default_result_queue() -> String {
    "client.q.judge.result".into()
}
fn default_dlq_queue_name() -> String {
    "judge_dlq".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            exchange: default_exchange(),
            submission_key: default_submission_key(),
            result_key: default_result_key(),
            result_queue: default_result_queue(),
            dlq_queue_name: default_dlq_queue_name(),
        }
    }
}
