use chrono::{DateTime, Utc};
use common::{Language, ResultStatus, Snippet};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::service::{SubmissionDetail, SubmissionSummary, UserTestcaseInput};
use crate::store::{SubmissionResultRecord, TestRunRecord};

#[derive(Deserialize, ToSchema)]
pub struct CreateSubmissionRequest {
    /// One of `C`, `Cpp`, `Java`, `Python3`.
    #[schema(example = "Cpp")]
    pub language: Language,
    /// Code snippets in display order. Locked snippets must match the
    /// problem's template.
    pub code: Vec<Snippet>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SubmitQuery {
    pub problem_id: i32,
    /// Submit within this contest. The contest must be running.
    pub contest_id: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TestRunQuery {
    pub problem_id: i32,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListSubmissionsQuery {
    pub problem_id: i32,
    /// Only submissions made within this contest.
    pub contest_id: Option<i32>,
    /// Default: 0.
    pub skip: Option<u64>,
    /// 1 to 100. Default: 10.
    pub take: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserTestRequest {
    #[schema(example = "Cpp")]
    pub language: Language,
    pub code: Vec<Snippet>,
    /// At least one; ids must be unique.
    pub user_testcases: Vec<UserTestcaseRequest>,
}

#[derive(Deserialize, ToSchema)]
pub struct UserTestcaseRequest {
    /// Label echoed back as the result's `testcaseId`.
    pub id: i32,
    pub input: String,
    /// Expected output.
    pub output: String,
}

impl From<UserTestcaseRequest> for UserTestcaseInput {
    fn from(tc: UserTestcaseRequest) -> Self {
        Self {
            id: tc.id,
            input: tc.input,
            output: tc.output,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResultResponse {
    pub id: i64,
    pub testcase_id: i32,
    pub status: ResultStatus,
    /// Milliseconds.
    pub cpu_time: Option<i64>,
    /// Bytes.
    pub memory_usage: Option<i64>,
    pub output: Option<String>,
}

impl From<SubmissionResultRecord> for SubmissionResultResponse {
    fn from(r: SubmissionResultRecord) -> Self {
        Self {
            id: r.id,
            testcase_id: r.testcase_id,
            status: r.status,
            cpu_time: r.cpu_time,
            memory_usage: r.memory_usage,
            output: r.output,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    #[schema(example = "0f6b1c9e2d7a4c3b8e5f1a2b3c4d5e6f")]
    pub id: String,
    pub user_id: i32,
    pub problem_id: i32,
    pub contest_id: Option<i32>,
    pub language: Language,
    pub code: Vec<Snippet>,
    /// Bytes of the concatenated code.
    pub code_size: i32,
    /// Derived from the test case results: `Judging` while any is pending,
    /// otherwise the first non-accepted status, or `Accepted`.
    pub status: ResultStatus,
    pub created_at: DateTime<Utc>,
    /// Ordered by test case id.
    pub results: Vec<SubmissionResultResponse>,
}

impl From<SubmissionDetail> for SubmissionResponse {
    fn from(detail: SubmissionDetail) -> Self {
        let s = detail.submission;
        Self {
            id: s.id,
            user_id: s.user_id,
            problem_id: s.problem_id,
            contest_id: s.contest_id,
            language: s.language,
            code: s.code,
            code_size: s.code_size,
            status: detail.status,
            created_at: s.created_at,
            results: detail.results.into_iter().map(Into::into).collect(),
        }
    }
}

/// A submission without its code and per-test-case results.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummaryResponse {
    pub id: String,
    pub user_id: i32,
    pub problem_id: i32,
    pub contest_id: Option<i32>,
    pub language: Language,
    pub code_size: i32,
    pub status: ResultStatus,
    pub created_at: DateTime<Utc>,
}

impl From<SubmissionSummary> for SubmissionSummaryResponse {
    fn from(summary: SubmissionSummary) -> Self {
        let s = summary.submission;
        Self {
            id: s.id,
            user_id: s.user_id,
            problem_id: s.problem_id,
            contest_id: s.contest_id,
            language: s.language,
            code_size: s.code_size,
            status: summary.status,
            created_at: s.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubmissionListResponse {
    /// Newest first.
    pub data: Vec<SubmissionSummaryResponse>,
    /// Matches across all pages.
    pub total: u64,
}

/// Latest known outcome of one test case in a test run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestRunResult {
    pub testcase_id: i32,
    pub status: ResultStatus,
    pub cpu_time: Option<i64>,
    pub memory_usage: Option<i64>,
    pub output: Option<String>,
}

impl From<TestRunRecord> for TestRunResult {
    fn from(r: TestRunRecord) -> Self {
        Self {
            testcase_id: r.testcase_id,
            status: r.status,
            cpu_time: r.cpu_time,
            memory_usage: r.memory_usage,
            output: r.output,
        }
    }
}
