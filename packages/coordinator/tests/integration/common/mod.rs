use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::{JudgeMode, Language, MessageKind, MessageProperties, Snippet, Template};
use coordinator::config::{
    AppConfig, CorsConfig, DatabaseConfig, JudgeConfig, MqAppConfig, ServerConfig,
    SubmissionConfig,
};
use coordinator::state::AppState;
use coordinator::store::{ContestRecord, MemoryStore, ProblemRecord, TestcaseRef};
use coordinator::{Coordinator, build_router};
use mq::{Disposition, MessageChannel, MemoryChannel, Subscription};
use reqwest::Client;
use serde_json::{Value, json};

pub mod routes {
    pub const SUBMISSIONS: &str = "/api/v1/submissions";
    pub const TEST_RUNS: &str = "/api/v1/submissions/test";
    pub const USER_TESTS: &str = "/api/v1/submissions/user-test";

    pub fn submit(problem_id: i32) -> String {
        format!("{SUBMISSIONS}?problemId={problem_id}")
    }

    pub fn submit_in_contest(problem_id: i32, contest_id: i32) -> String {
        format!("{SUBMISSIONS}?problemId={problem_id}&contestId={contest_id}")
    }

    pub fn submission(id: &str) -> String {
        format!("{SUBMISSIONS}/{id}")
    }

    pub fn test_run(problem_id: i32) -> String {
        format!("{TEST_RUNS}?problemId={problem_id}")
    }

    pub fn user_test(problem_id: i32) -> String {
        format!("{USER_TESTS}?problemId={problem_id}")
    }

    pub fn list(problem_id: i32) -> String {
        format!("{SUBMISSIONS}?problemId={problem_id}")
    }

    pub fn list_in_contest(problem_id: i32, contest_id: i32) -> String {
        format!("{SUBMISSIONS}?problemId={problem_id}&contestId={contest_id}")
    }
}

/// A running coordinator over the in-memory store and channel.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: MemoryStore,
    pub channel: MemoryChannel,
    pub config: AppConfig,
    pub coordinator: Arc<Coordinator>,
    pub subscription: Option<Subscription>,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, body }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig::default(),
        },
        database: DatabaseConfig::with_url("postgres://unused"),
        mq: MqAppConfig::default(),
        judge: JudgeConfig {
            enable_result_consumer: true,
        },
        submission: SubmissionConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(true).await
    }

    pub async fn spawn_with(enable_result_consumer: bool) -> Self {
        Self::spawn_sharing(MemoryStore::new(), MemoryChannel::new(), enable_result_consumer).await
    }

    /// Another instance over the same store and channel, as a second
    /// process pointed at the same database and broker would be.
    pub async fn spawn_sharing(
        store: MemoryStore,
        channel: MemoryChannel,
        enable_result_consumer: bool,
    ) -> Self {
        let config = test_config();

        let coordinator = Arc::new(Coordinator::new(
            &config,
            Arc::new(store.clone()),
            Arc::new(channel.clone()),
            enable_result_consumer,
        ));
        let subscription = coordinator
            .start()
            .await
            .expect("Failed to start result consumer");

        let state = AppState {
            config: Arc::new(config.clone()),
            submissions: coordinator.submissions(),
        };
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            store,
            channel,
            config,
            coordinator,
            subscription,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_as(&self, path: &str, body: &Value, user_id: i32) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("X-User-Id", user_id.to_string())
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_anonymous(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post_anonymous(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_as(&self, path: &str, user_id: i32) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("X-User-Id", user_id.to_string())
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// Seed a problem accepting `languages`, with the given (id, hidden) test cases.
    pub async fn seed_problem(
        &self,
        id: i32,
        languages: &[Language],
        templates: Vec<Template>,
        testcases: &[(i32, bool)],
    ) {
        self.store
            .insert_problem(ProblemRecord {
                id,
                time_limit: 1000,
                memory_limit: 128,
                languages: languages.to_vec(),
                templates,
                judge_mode: JudgeMode::Classic,
            })
            .await;
        for &(tc, is_hidden) in testcases {
            self.store
                .insert_testcase(id, TestcaseRef { id: tc, is_hidden })
                .await;
        }
    }

    pub async fn seed_contest(&self, contest: ContestRecord, problem_ids: &[i32]) {
        let id = contest.id;
        self.store.insert_contest(contest).await;
        for &problem_id in problem_ids {
            self.store.add_contest_problem(id, problem_id).await;
        }
    }

    /// Publish a judge result as the external judge would.
    pub async fn respond(&self, kind: MessageKind, id: &str, payload: Value) {
        self.channel
            .publish(
                &self.config.mq.exchange,
                &self.config.mq.result_key,
                payload,
                MessageProperties::new(id, kind),
            )
            .await
            .expect("Failed to publish judge result");
    }

    /// Answer every judge request that has no result yet with `result_code`.
    pub async fn judge_pending(&self, result_code: i64) {
        let answered: Vec<String> = self
            .channel
            .dispositions()
            .await
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let pending: Vec<_> = self
            .channel
            .published_to(&self.config.mq.submission_key)
            .await
            .into_iter()
            .filter(|m| !answered.contains(&m.properties.message_id))
            .collect();

        for request in &pending {
            let id = &request.properties.message_id;
            let kind = request.properties.kind().expect("request without a known type");
            self.respond(kind, id, judge_result(id, result_code)).await;
        }
        self.wait_for_dispositions(answered.len() + pending.len()).await;
    }

    pub async fn wait_for_dispositions(&self, count: usize) -> Vec<(String, Disposition)> {
        tokio::time::timeout(
            Duration::from_secs(5),
            self.channel.wait_for_dispositions(count),
        )
        .await
        .expect("Result consumer did not settle in time")
    }
}

pub fn snippet(id: i32, text: &str, locked: bool) -> Snippet {
    Snippet {
        id,
        text: text.to_string(),
        locked,
    }
}

pub fn submission_body(language: &str) -> Value {
    json!({
        "language": language,
        "code": [{"id": 1, "text": "print(input())", "locked": false}],
    })
}

/// A judge result for one test case.
pub fn judge_result(id: &str, result_code: i64) -> Value {
    json!({
        "resultCode": result_code,
        "submissionResultId": id,
        "error": "",
        "data": {
            "acceptedNum": 0,
            "totalTestcase": 1,
            "judgeResult": [{
                "testcaseId": 0,
                "resultCode": result_code,
                "cpuTime": 11,
                "realTime": 13,
                "memory": 65536,
                "signal": 0,
                "exitCode": 0,
                "errorCode": 0,
                "output": "out"
            }]
        }
    })
}
