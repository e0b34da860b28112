//! Persistence seam of the coordinator.
//!
//! [`JudgeStore`] covers the reads submission creation needs (problem,
//! contest, test cases) and the submission result lifecycle: the submission
//! and one pending row per test case are written together, then one update
//! per judge result. Test runs live here too, so that every instance sees
//! the results the consuming instance records.

pub mod database;
pub mod memory;

pub use database::DbStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{JudgeMode, Language, ProblemLimits, ResultStatus, Snippet, Template};
use sea_orm::prelude::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt {what} record {id}: {reason}")]
    Corrupt {
        what: &'static str,
        id: String,
        reason: String,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRecord {
    pub id: i32,
    /// Milliseconds.
    pub time_limit: u64,
    /// Mebibytes.
    pub memory_limit: u64,
    pub languages: Vec<Language>,
    pub templates: Vec<Template>,
    pub judge_mode: JudgeMode,
}

impl ProblemRecord {
    pub fn allows(&self, language: Language) -> bool {
        self.languages.contains(&language)
    }

    pub fn limits(&self) -> ProblemLimits {
        ProblemLimits {
            problem_id: self.id,
            time_limit: self.time_limit,
            memory_limit: self.memory_limit,
            judge_mode: self.judge_mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestcaseRef {
    pub id: i32,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestRecord {
    pub id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ContestRecord {
    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub id: String,
    pub user_id: i32,
    pub problem_id: i32,
    pub contest_id: Option<i32>,
    pub language: Language,
    pub code: Vec<Snippet>,
    pub code_size: i32,
    /// One `Judging` row is created per entry.
    pub testcase_ids: Vec<i32>,
}

/// A freshly written submission. `result_ids` follow the order of
/// [`NewSubmission::testcase_ids`].
#[derive(Debug, Clone)]
pub struct CreatedSubmission {
    pub submission: SubmissionRecord,
    pub result_ids: Vec<i64>,
}

/// Which submissions [`JudgeStore::list_submissions`] returns. `None` fields
/// do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub problem_id: i32,
    pub contest_id: Option<i32>,
    pub user_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    pub take: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub id: String,
    pub user_id: i32,
    pub problem_id: i32,
    pub contest_id: Option<i32>,
    pub language: Language,
    pub code: Vec<Snippet>,
    pub code_size: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResultRecord {
    pub id: i64,
    pub submission_id: String,
    pub testcase_id: i32,
    pub status: ResultStatus,
    pub cpu_time: Option<i64>,
    pub memory_usage: Option<i64>,
    pub output: Option<String>,
}

/// Outcome of one test case, as written by [`JudgeStore::apply_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultUpdate {
    pub status: ResultStatus,
    pub cpu_time: Option<i64>,
    pub memory_usage: Option<i64>,
    pub output: Option<String>,
}

/// The two flavours of test run. A user holds at most one run of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum TestRunKind {
    /// Against the problem's public test cases.
    #[sea_orm(string_value = "public")]
    Public,
    /// Against input the user typed in.
    #[sea_orm(string_value = "user")]
    User,
}

#[derive(Debug, Clone)]
pub struct NewTestRun {
    pub user_id: i32,
    pub kind: TestRunKind,
    pub run_id: String,
    pub testcase_ids: Vec<i32>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunRecord {
    pub testcase_id: i32,
    pub status: ResultStatus,
    pub cpu_time: Option<i64>,
    pub memory_usage: Option<i64>,
    pub output: Option<String>,
}

impl TestRunRecord {
    pub fn judging(testcase_id: i32) -> Self {
        Self {
            testcase_id,
            status: ResultStatus::Judging,
            cpu_time: None,
            memory_usage: None,
            output: None,
        }
    }
}

#[async_trait]
pub trait JudgeStore: Send + Sync {
    async fn find_problem(&self, id: i32) -> Result<Option<ProblemRecord>, StoreError>;

    /// Test cases of a problem, ordered by id.
    async fn list_testcases(&self, problem_id: i32) -> Result<Vec<TestcaseRef>, StoreError>;

    async fn find_contest(&self, id: i32) -> Result<Option<ContestRecord>, StoreError>;

    async fn is_problem_in_contest(
        &self,
        contest_id: i32,
        problem_id: i32,
    ) -> Result<bool, StoreError>;

    /// Write the submission and its `Judging` rows as one unit: either all
    /// of them exist afterwards or none do.
    async fn create_submission(&self, new: NewSubmission)
    -> Result<CreatedSubmission, StoreError>;

    async fn find_submission(&self, id: &str) -> Result<Option<SubmissionRecord>, StoreError>;

    /// Matching submissions, newest first, with the total match count.
    /// `page: None` returns every match.
    async fn list_submissions(
        &self,
        filter: SubmissionFilter,
        page: Option<Page>,
    ) -> Result<(Vec<SubmissionRecord>, u64), StoreError>;

    /// Overwrite the row `result_id` with `update`, whatever its current
    /// status. Returns `false` when no such row exists.
    async fn apply_result(&self, result_id: i64, update: ResultUpdate) -> Result<bool, StoreError>;

    /// Results of a submission, ordered by test case id.
    async fn list_results(
        &self,
        submission_id: &str,
    ) -> Result<Vec<SubmissionResultRecord>, StoreError>;

    /// Results of several submissions, ordered by submission then test case.
    async fn list_results_for(
        &self,
        submission_ids: &[String],
    ) -> Result<Vec<SubmissionResultRecord>, StoreError>;

    /// Start a test run: every test case becomes `Judging`. Replaces the
    /// user's previous run of the same kind and drops runs expired at `now`.
    async fn begin_test_run(&self, run: NewTestRun, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Record one test-run result. Returns `false` unless `run_id` is the
    /// user's live run of that kind and it has `testcase_id`.
    async fn apply_test_result(
        &self,
        user_id: i32,
        kind: TestRunKind,
        run_id: &str,
        testcase_id: i32,
        update: ResultUpdate,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// The user's live run of `kind`, ordered by test case id.
    async fn list_test_results(
        &self,
        user_id: i32,
        kind: TestRunKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<TestRunRecord>, StoreError>;
}
