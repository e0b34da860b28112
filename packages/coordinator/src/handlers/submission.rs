use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::{AppJson, AppQuery};
use crate::extractors::user::CurrentUser;
use crate::models::submission::*;
use crate::service::CreateSubmission;
use crate::state::AppState;
use crate::store::{Page, TestRunKind};

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

impl From<CreateSubmissionRequest> for CreateSubmission {
    fn from(req: CreateSubmissionRequest) -> Self {
        Self {
            language: req.language,
            code: req.code,
        }
    }
}

/// Submit a solution for judging.
#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Submit a solution to a problem",
    description = "Creates a submission and queues one judge request per test case. \
                   Poll the submission for results.",
    params(SubmitQuery, ("X-User-Id" = i32, Header, description = "Caller id set by the gateway")),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Submission created", body = SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Problem or contest not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Language, template or contest window (CONFLICT)",
            body = ErrorBody),
    ),
)]
#[instrument(skip_all, fields(user_id = user.user_id, problem_id = query.problem_id))]
pub async fn create_submission(
    user: CurrentUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SubmitQuery>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state
        .submissions
        .submit(user.user_id, query.problem_id, query.contest_id, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(SubmissionResponse::from(detail))))
}

/// List the submissions to a problem.
#[utoipa::path(
    get,
    path = "/",
    tag = "Submissions",
    operation_id = "listSubmissions",
    summary = "List submissions to a problem",
    description = "Newest first. With `contestId`, only submissions made within that contest.",
    params(
        ListSubmissionsQuery,
        ("X-User-Id" = i32, Header, description = "Caller id set by the gateway"),
    ),
    responses(
        (status = 200, description = "One page of submissions", body = SubmissionListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Problem or contest not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
pub async fn list_submissions(
    _user: CurrentUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListSubmissionsQuery>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let take = query.take.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&take) {
        return Err(AppError::Validation(format!(
            "take must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let page = Page {
        skip: query.skip.unwrap_or(0),
        take,
    };

    let (summaries, total) = state
        .submissions
        .list_submissions(query.problem_id, query.contest_id, page)
        .await?;

    Ok(Json(SubmissionListResponse {
        data: summaries.into_iter().map(Into::into).collect(),
        total,
    }))
}

/// Get a submission with its test case results.
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get a submission",
    description = "Owners always see their submissions. Others must have passed the problem, \
                   and must wait for the contest to end for contest submissions.",
    params(
        ("id" = String, Path, description = "Submission id"),
        ("X-User-Id" = i32, Header, description = "Caller id set by the gateway"),
    ),
    responses(
        (status = 200, description = "Submission with results", body = SubmissionResponse),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 403, description = "Problem not passed or contest running (FORBIDDEN)",
            body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip_all, fields(user_id = user.user_id, submission_id = %id))]
pub async fn get_submission(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let detail = state.submissions.get_submission(&id, user.user_id).await?;
    Ok(Json(detail.into()))
}

/// Run code against the public test cases of a problem.
#[utoipa::path(
    post,
    path = "/test",
    tag = "Submissions",
    operation_id = "createTestRun",
    summary = "Test a solution on public test cases",
    description = "Queues the code against every non-hidden test case. Results are kept \
                   for a short time and are not stored as a submission.",
    params(TestRunQuery, ("X-User-Id" = i32, Header, description = "Caller id set by the gateway")),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 202, description = "Test run queued", body = Vec<TestRunResult>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Language not allowed or template mismatch (CONFLICT)",
            body = ErrorBody),
        (status = 422, description = "Problem has no public test cases (UNPROCESSABLE)",
            body = ErrorBody),
    ),
)]
#[instrument(skip_all, fields(user_id = user.user_id, problem_id = query.problem_id))]
pub async fn create_test_run(
    user: CurrentUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TestRunQuery>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pending = state
        .submissions
        .submit_test(user.user_id, query.problem_id, payload.into())
        .await?;

    let pending: Vec<TestRunResult> = pending.into_iter().map(Into::into).collect();
    Ok((StatusCode::ACCEPTED, Json(pending)))
}

/// Latest test-run results of the caller.
#[utoipa::path(
    get,
    path = "/test",
    tag = "Submissions",
    operation_id = "getTestRunResults",
    summary = "Get test-run results",
    params(("X-User-Id" = i32, Header, description = "Caller id set by the gateway")),
    responses(
        (status = 200, description = "Results ordered by test case id", body = Vec<TestRunResult>),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 500, description = "Store unavailable (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
pub async fn get_test_results(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TestRunResult>>, AppError> {
    let results = state
        .submissions
        .test_results(user.user_id, TestRunKind::Public)
        .await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}

/// Run code against input the caller supplies.
#[utoipa::path(
    post,
    path = "/user-test",
    tag = "Submissions",
    operation_id = "createUserTestRun",
    summary = "Test a solution on your own test cases",
    description = "Queues the code once per supplied input/output pair. Results are kept \
                   for a short time, separately from public test runs.",
    params(TestRunQuery, ("X-User-Id" = i32, Header, description = "Caller id set by the gateway")),
    request_body = UserTestRequest,
    responses(
        (status = 202, description = "Test run queued", body = Vec<TestRunResult>),
        (status = 400, description = "No or duplicate test cases (VALIDATION_ERROR)",
            body = ErrorBody),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Language not allowed or template mismatch (CONFLICT)",
            body = ErrorBody),
    ),
)]
#[instrument(skip_all, fields(user_id = user.user_id, problem_id = query.problem_id))]
pub async fn create_user_test_run(
    user: CurrentUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TestRunQuery>,
    AppJson(payload): AppJson<UserTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = CreateSubmission {
        language: payload.language,
        code: payload.code,
    };
    let testcases = payload.user_testcases.into_iter().map(Into::into).collect();
    let pending = state
        .submissions
        .submit_user_test(user.user_id, query.problem_id, req, testcases)
        .await?;

    let pending: Vec<TestRunResult> = pending.into_iter().map(Into::into).collect();
    Ok((StatusCode::ACCEPTED, Json(pending)))
}

/// Latest user-test results of the caller.
#[utoipa::path(
    get,
    path = "/user-test",
    tag = "Submissions",
    operation_id = "getUserTestRunResults",
    summary = "Get user-test results",
    params(("X-User-Id" = i32, Header, description = "Caller id set by the gateway")),
    responses(
        (status = 200, description = "Results ordered by test case id", body = Vec<TestRunResult>),
        (status = 401, description = "Missing caller identity (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
pub async fn get_user_test_results(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TestRunResult>>, AppError> {
    let results = state
        .submissions
        .test_results(user.user_id, TestRunKind::User)
        .await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}
