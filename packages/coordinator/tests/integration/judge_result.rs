use std::time::Duration;

use common::{Language, MessageKind, ResultStatus};
use coordinator::service::RunKey;
use coordinator::store::MemoryStore;
use mq::{Disposition, MemoryChannel};
use serde_json::json;

use crate::common::{TestApp, judge_result, routes, submission_body};

/// Submit to a problem with `testcases` test cases and return
/// (submission id, result row ids in test case order).
async fn submit(app: &TestApp, testcases: &[i32]) -> (String, Vec<String>) {
    let cases: Vec<(i32, bool)> = testcases.iter().map(|&id| (id, false)).collect();
    app.seed_problem(1, &[Language::Cpp], vec![], &cases).await;

    let res = app.post_as(&routes::submit(1), &submission_body("Cpp"), 1).await;
    assert_eq!(res.status, 201);

    let id = res.body["id"].as_str().unwrap().to_string();
    let result_ids = res.body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap().to_string())
        .collect();
    (id, result_ids)
}

#[tokio::test]
async fn statuses_do_not_depend_on_arrival_order() {
    let app = TestApp::spawn().await;
    let (id, rows) = submit(&app, &[1, 2, 3]).await;

    app.respond(MessageKind::Judge, &rows[2], judge_result(&rows[2], 4)).await;
    app.respond(MessageKind::Judge, &rows[0], judge_result(&rows[0], 0)).await;
    app.respond(MessageKind::Judge, &rows[1], judge_result(&rows[1], 1)).await;

    let dispositions = app.wait_for_dispositions(3).await;
    assert!(dispositions.iter().all(|(_, d)| *d == Disposition::Ack));

    let res = app.get_as(&routes::submission(&id), 1).await;
    let statuses: Vec<&str> = res.body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["Accepted", "WrongAnswer", "MemoryLimitExceeded"]);
    assert_eq!(res.body["status"], "WrongAnswer");
}

#[tokio::test]
async fn submission_is_judging_until_every_result_arrives() {
    let app = TestApp::spawn().await;
    let (id, rows) = submit(&app, &[1, 2]).await;

    app.respond(MessageKind::Judge, &rows[1], judge_result(&rows[1], 5)).await;
    app.wait_for_dispositions(1).await;
    let res = app.get_as(&routes::submission(&id), 1).await;
    assert_eq!(res.body["status"], "Judging");

    app.respond(MessageKind::Judge, &rows[0], judge_result(&rows[0], 0)).await;
    app.wait_for_dispositions(2).await;
    let res = app.get_as(&routes::submission(&id), 1).await;
    assert_eq!(res.body["status"], "RuntimeError");
}

#[tokio::test]
async fn all_accepted_means_accepted() {
    let app = TestApp::spawn().await;
    let (id, rows) = submit(&app, &[1, 2]).await;

    for row in &rows {
        app.respond(MessageKind::Judge, row, judge_result(row, 0)).await;
    }
    app.wait_for_dispositions(2).await;

    let res = app.get_as(&routes::submission(&id), 1).await;
    assert_eq!(res.body["status"], "Accepted");
    assert_eq!(res.body["results"][0]["cpuTime"], 11);
    assert_eq!(res.body["results"][0]["memoryUsage"], 65536);
}

#[tokio::test]
async fn duplicate_results_are_idempotent() {
    let app = TestApp::spawn().await;
    let (_, rows) = submit(&app, &[1]).await;

    app.respond(MessageKind::Judge, &rows[0], judge_result(&rows[0], 2)).await;
    app.wait_for_dispositions(1).await;
    let first = app.store.results().await;

    app.respond(MessageKind::Judge, &rows[0], judge_result(&rows[0], 2)).await;
    app.wait_for_dispositions(2).await;
    let second = app.store.results().await;

    assert_eq!(first, second);
    assert_eq!(second[0].status, ResultStatus::TimeLimitExceeded);
}

#[tokio::test]
async fn unknown_result_codes_become_server_errors() {
    let app = TestApp::spawn().await;
    let (_, rows) = submit(&app, &[1]).await;

    app.respond(MessageKind::Judge, &rows[0], judge_result(&rows[0], 42)).await;
    app.wait_for_dispositions(1).await;

    assert_eq!(app.store.results().await[0].status, ResultStatus::ServerError);
}

#[tokio::test]
async fn malformed_results_are_discarded_without_requeue() {
    let app = TestApp::spawn().await;
    let (_, rows) = submit(&app, &[1]).await;

    let missing_code = json!({"submissionResultId": rows[0], "error": ""});
    app.respond(MessageKind::Judge, &rows[0], missing_code).await;

    let dispositions = app.wait_for_dispositions(1).await;
    assert_eq!(dispositions[0].1, Disposition::Nack { requeue: false });
    assert_eq!(app.channel.dead_letters().await.len(), 1);
    assert_eq!(app.store.results().await[0].status, ResultStatus::Judging);
}

#[tokio::test]
async fn orphan_results_are_acknowledged() {
    let app = TestApp::spawn().await;
    submit(&app, &[1]).await;

    app.respond(MessageKind::Judge, "9999", judge_result("9999", 0)).await;

    let dispositions = app.wait_for_dispositions(1).await;
    assert_eq!(dispositions[0].1, Disposition::Ack);
    assert!(app.channel.dead_letters().await.is_empty());
    assert_eq!(app.store.results().await[0].status, ResultStatus::Judging);
}

#[tokio::test]
async fn store_failures_are_requeued() {
    let app = TestApp::spawn().await;
    let (_, rows) = submit(&app, &[1]).await;
    app.store.set_failing(true);

    app.respond(MessageKind::Judge, &rows[0], judge_result(&rows[0], 0)).await;

    // One delivery plus the channel's five redeliveries.
    let dispositions = app.wait_for_dispositions(6).await;
    assert!(
        dispositions
            .iter()
            .all(|(_, d)| *d == Disposition::Nack { requeue: true })
    );
    assert_eq!(app.store.results().await[0].status, ResultStatus::Judging);
}

/// Start a test run of user 4 through `app` and return its request keys.
async fn start_run(app: &TestApp) -> Vec<RunKey> {
    let before = app.channel.published().await.len();
    let res = app.post_as(&routes::test_run(1), &submission_body("C"), 4).await;
    assert_eq!(res.status, 202);

    app.channel.published().await[before..]
        .iter()
        .map(|m| m.properties.message_id.parse().unwrap())
        .collect()
}

#[tokio::test]
async fn test_run_results_reach_the_run() {
    let app = TestApp::spawn().await;
    app.seed_problem(1, &[Language::C], vec![], &[(1, false), (2, false)]).await;
    let keys = start_run(&app).await;
    let key = keys.iter().find(|k| k.testcase_id == 2).unwrap().to_string();

    app.respond(MessageKind::Run, &key, judge_result(&key, 1)).await;
    app.wait_for_dispositions(1).await;

    let res = app.get_as(routes::TEST_RUNS, 4).await;
    assert_eq!(res.body[0]["status"], "Judging");
    assert_eq!(res.body[1]["status"], "WrongAnswer");
    assert_eq!(res.body[1]["output"], "out");
}

#[tokio::test]
async fn late_results_of_a_replaced_run_are_ignored() {
    let app = TestApp::spawn().await;
    app.seed_problem(1, &[Language::C], vec![], &[(1, false)]).await;

    let first = start_run(&app).await[0].to_string();
    let second = start_run(&app).await[0].to_string();
    assert_ne!(first, second);

    app.respond(MessageKind::Run, &first, judge_result(&first, 0)).await;
    let dispositions = app.wait_for_dispositions(1).await;
    assert_eq!(dispositions[0].1, Disposition::Ack);

    let res = app.get_as(routes::TEST_RUNS, 4).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["status"], "Judging");

    app.respond(MessageKind::Run, &second, judge_result(&second, 0)).await;
    app.wait_for_dispositions(2).await;
    let res = app.get_as(routes::TEST_RUNS, 4).await;
    assert_eq!(res.body[0]["status"], "Accepted");
}

#[tokio::test]
async fn results_consumed_elsewhere_are_visible_to_the_api_instance() {
    let consumer = TestApp::spawn().await;
    let api = TestApp::spawn_sharing(consumer.store.clone(), consumer.channel.clone(), false).await;
    assert!(api.subscription.is_none());
    consumer
        .seed_problem(1, &[Language::C], vec![], &[(1, false), (2, false)])
        .await;

    for key in start_run(&api).await {
        let key = key.to_string();
        consumer.respond(MessageKind::Run, &key, judge_result(&key, 0)).await;
    }
    consumer.wait_for_dispositions(2).await;

    let res = api.get_as(routes::TEST_RUNS, 4).await;
    let statuses: Vec<&str> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["Accepted", "Accepted"]);
}

#[tokio::test]
async fn graded_results_consumed_elsewhere_are_visible_to_the_api_instance() {
    let channel = MemoryChannel::new();
    let consumer = TestApp::spawn_sharing(MemoryStore::new(), channel.clone(), true).await;
    let api = TestApp::spawn_sharing(consumer.store.clone(), channel, false).await;
    consumer.seed_problem(1, &[Language::Cpp], vec![], &[(1, false)]).await;

    let res = api.post_as(&routes::submit(1), &submission_body("Cpp"), 1).await;
    let id = res.body["id"].as_str().unwrap().to_string();
    consumer.judge_pending(0).await;

    let res = api.get_as(&routes::submission(&id), 1).await;
    assert_eq!(res.body["status"], "Accepted");
}

#[tokio::test]
async fn disabled_consumer_leaves_results_queued() {
    let app = TestApp::spawn_with(false).await;
    let (_, rows) = submit(&app, &[1]).await;

    app.respond(MessageKind::Judge, &rows[0], judge_result(&rows[0], 0)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(app.subscription.is_none());
    assert!(app.channel.dispositions().await.is_empty());
    assert_eq!(app.store.results().await[0].status, ResultStatus::Judging);
}

#[tokio::test]
async fn second_consumer_is_refused() {
    let app = TestApp::spawn().await;
    assert!(app.coordinator.start().await.is_err());
}
