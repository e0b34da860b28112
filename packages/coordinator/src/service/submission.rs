use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::code::{flatten, is_valid_code};
use common::config::MqAppConfig;
use common::{
    JudgeRequest, Language, MessageKind, MessageProperties, ResultStatus, Snippet, UserTestcase,
    result_status::aggregate,
};
use futures::future::try_join_all;
use mq::{MessageChannel, MqError};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::test_run::{RunKey, new_run_id};
use crate::error::AppError;
use crate::store::{
    JudgeStore, NewSubmission, NewTestRun, Page, ProblemRecord, SubmissionFilter,
    SubmissionRecord, SubmissionResultRecord, TestRunKind, TestRunRecord,
};

/// Code and language of a submission or test run.
#[derive(Debug, Clone)]
pub struct CreateSubmission {
    pub language: Language,
    pub code: Vec<Snippet>,
}

/// One input/expected-output pair of a user test run. `id` is the user's
/// own label and comes back as the result's test case id.
#[derive(Debug, Clone)]
pub struct UserTestcaseInput {
    pub id: i32,
    pub input: String,
    pub output: String,
}

/// A submission with its per-test-case results and the status derived from them.
#[derive(Debug, Clone)]
pub struct SubmissionDetail {
    pub submission: SubmissionRecord,
    pub status: ResultStatus,
    pub results: Vec<SubmissionResultRecord>,
}

#[derive(Debug, Clone)]
pub struct SubmissionSummary {
    pub submission: SubmissionRecord,
    pub status: ResultStatus,
}

pub struct SubmissionService {
    store: Arc<dyn JudgeStore>,
    channel: Arc<dyn MessageChannel>,
    mq: MqAppConfig,
    test_run_ttl: Duration,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn JudgeStore>,
        channel: Arc<dyn MessageChannel>,
        mq: MqAppConfig,
        test_run_ttl: Duration,
    ) -> Self {
        Self {
            store,
            channel,
            mq,
            test_run_ttl,
        }
    }

    /// Run every check that can reject a submission. Nothing is written
    /// before these pass.
    async fn check_submittable(
        &self,
        problem_id: i32,
        contest_id: Option<i32>,
        req: &CreateSubmission,
    ) -> Result<ProblemRecord, AppError> {
        if req.code.is_empty() {
            return Err(AppError::Validation("Code must not be empty".into()));
        }

        let problem = self.find_problem(problem_id).await?;

        if let Some(contest_id) = contest_id {
            let contest = self
                .store
                .find_contest(contest_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;
            if !contest.is_ongoing(Utc::now()) {
                return Err(AppError::Conflict("Contest is not ongoing".into()));
            }
            if !self.store.is_problem_in_contest(contest_id, problem_id).await? {
                return Err(AppError::NotFound("Problem not found in contest".into()));
            }
        }

        if !problem.allows(req.language) {
            return Err(AppError::Conflict(format!(
                "Language {} is not allowed for this problem",
                req.language
            )));
        }
        if !is_valid_code(&req.code, req.language, &problem.templates) {
            return Err(AppError::Conflict(
                "Code does not match the problem template".into(),
            ));
        }

        Ok(problem)
    }

    async fn find_problem(&self, problem_id: i32) -> Result<ProblemRecord, AppError> {
        self.store
            .find_problem(problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Problem not found".into()))
    }

    /// Create a graded submission and dispatch one judge request per test case.
    ///
    /// The submission and its `Judging` rows are written in one store call.
    /// When a publish fails afterwards the rows stay `Judging` and the caller
    /// gets an error.
    #[instrument(skip(self, req), fields(language = %req.language))]
    pub async fn submit(
        &self,
        user_id: i32,
        problem_id: i32,
        contest_id: Option<i32>,
        req: CreateSubmission,
    ) -> Result<SubmissionDetail, AppError> {
        let problem = self.check_submittable(problem_id, contest_id, &req).await?;
        let testcase_ids: Vec<i32> = self
            .store
            .list_testcases(problem_id)
            .await?
            .into_iter()
            .map(|tc| tc.id)
            .collect();

        let code_size = i32::try_from(flatten(&req.code).len())
            .map_err(|_| AppError::Validation("Code is too large".into()))?;

        let created = self
            .store
            .create_submission(NewSubmission {
                id: Uuid::new_v4().simple().to_string(),
                user_id,
                problem_id,
                contest_id,
                language: req.language,
                code: req.code,
                code_size,
                testcase_ids: testcase_ids.clone(),
            })
            .await?;
        let submission = created.submission;

        let limits = problem.limits();
        let publishes = created
            .result_ids
            .iter()
            .zip(&testcase_ids)
            .map(|(&result_id, &testcase_id)| {
                let request = JudgeRequest::build(
                    &submission.code,
                    submission.language,
                    &limits,
                    testcase_id,
                );
                let properties =
                    MessageProperties::new(result_id.to_string(), MessageKind::Judge);
                self.publish(request, properties)
            });
        try_join_all(publishes).await?;

        info!(
            submission_id = %submission.id,
            testcases = testcase_ids.len(),
            "Submission dispatched"
        );

        self.detail(submission).await
    }

    /// Run the code against the problem's public test cases. Nothing is
    /// stored as a submission; results land with the user's test run.
    #[instrument(skip(self, req), fields(language = %req.language))]
    pub async fn submit_test(
        &self,
        user_id: i32,
        problem_id: i32,
        req: CreateSubmission,
    ) -> Result<Vec<TestRunRecord>, AppError> {
        let problem = self.check_submittable(problem_id, None, &req).await?;
        let cases: Vec<(i32, Option<UserTestcase>)> = self
            .store
            .list_testcases(problem_id)
            .await?
            .into_iter()
            .filter(|tc| !tc.is_hidden)
            .map(|tc| (tc.id, None))
            .collect();

        if cases.is_empty() {
            return Err(AppError::Unprocessable(
                "Problem has no public test cases".into(),
            ));
        }

        self.start_test_run(user_id, TestRunKind::Public, &problem, &req, cases)
            .await
    }

    /// Run the code against input/output pairs the user supplied.
    #[instrument(skip(self, req, testcases), fields(language = %req.language))]
    pub async fn submit_user_test(
        &self,
        user_id: i32,
        problem_id: i32,
        req: CreateSubmission,
        testcases: Vec<UserTestcaseInput>,
    ) -> Result<Vec<TestRunRecord>, AppError> {
        if testcases.is_empty() {
            return Err(AppError::Validation(
                "At least one user test case is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = testcases.iter().find(|tc| !seen.insert(tc.id)) {
            return Err(AppError::Validation(format!(
                "User test case id {} is used more than once",
                dup.id
            )));
        }

        let problem = self.check_submittable(problem_id, None, &req).await?;
        let cases = testcases
            .into_iter()
            .map(|tc| {
                let testcase = UserTestcase {
                    input: tc.input,
                    output: tc.output,
                };
                (tc.id, Some(testcase))
            })
            .collect();

        self.start_test_run(user_id, TestRunKind::User, &problem, &req, cases)
            .await
    }

    async fn start_test_run(
        &self,
        user_id: i32,
        kind: TestRunKind,
        problem: &ProblemRecord,
        req: &CreateSubmission,
        cases: Vec<(i32, Option<UserTestcase>)>,
    ) -> Result<Vec<TestRunRecord>, AppError> {
        let now = Utc::now();
        let run_id = new_run_id();
        let testcase_ids: Vec<i32> = cases.iter().map(|(id, _)| *id).collect();

        self.store
            .begin_test_run(
                NewTestRun {
                    user_id,
                    kind,
                    run_id: run_id.clone(),
                    testcase_ids: testcase_ids.clone(),
                    expires_at: now
                        .checked_add_signed(self.test_run_ttl)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC),
                },
                now,
            )
            .await?;

        let limits = problem.limits();
        let publishes = cases.into_iter().map(|(testcase_id, user_testcase)| {
            let mut request = JudgeRequest::build(&req.code, req.language, &limits, testcase_id);
            if let Some(testcase) = user_testcase {
                request = request.with_user_testcase(testcase);
            }
            let key = RunKey::new(user_id, &run_id, testcase_id);
            let properties = MessageProperties::new(key.to_string(), kind.message_kind());
            self.publish(request, properties)
        });
        try_join_all(publishes).await?;

        info!(
            user_id,
            problem_id = problem.id,
            run_id = %run_id,
            ?kind,
            testcases = testcase_ids.len(),
            "Test run dispatched"
        );

        let mut pending: Vec<_> = testcase_ids.into_iter().map(TestRunRecord::judging).collect();
        pending.sort_by_key(|r| r.testcase_id);
        Ok(pending)
    }

    pub async fn test_results(
        &self,
        user_id: i32,
        kind: TestRunKind,
    ) -> Result<Vec<TestRunRecord>, AppError> {
        Ok(self
            .store
            .list_test_results(user_id, kind, Utc::now())
            .await?)
    }

    /// A submission as `caller` may see it.
    ///
    /// Owners always see their submissions. Others are refused while the
    /// submission's contest is running, and otherwise need an accepted
    /// submission of their own for the problem.
    pub async fn get_submission(
        &self,
        id: &str,
        caller: i32,
    ) -> Result<SubmissionDetail, AppError> {
        let submission = self
            .store
            .find_submission(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

        if submission.user_id != caller {
            if let Some(contest_id) = submission.contest_id {
                let ongoing = self
                    .store
                    .find_contest(contest_id)
                    .await?
                    .is_some_and(|c| c.is_ongoing(Utc::now()));
                if ongoing {
                    return Err(AppError::Forbidden(
                        "Contest should end first before you browse other people's submissions"
                            .into(),
                    ));
                }
            }
            if !self.has_passed(caller, submission.problem_id).await? {
                return Err(AppError::Forbidden(
                    "You must pass the problem first to browse other people's submissions".into(),
                ));
            }
        }

        self.detail(submission).await
    }

    /// Submissions to a problem, or to a problem within one contest, newest
    /// first, with the total count.
    pub async fn list_submissions(
        &self,
        problem_id: i32,
        contest_id: Option<i32>,
        page: Page,
    ) -> Result<(Vec<SubmissionSummary>, u64), AppError> {
        self.find_problem(problem_id).await?;
        if let Some(contest_id) = contest_id {
            if self.store.find_contest(contest_id).await?.is_none() {
                return Err(AppError::NotFound("Contest not found".into()));
            }
            if !self.store.is_problem_in_contest(contest_id, problem_id).await? {
                return Err(AppError::NotFound("Problem not found in contest".into()));
            }
        }

        let filter = SubmissionFilter {
            problem_id,
            contest_id,
            user_id: None,
        };
        let (submissions, total) = self.store.list_submissions(filter, Some(page)).await?;
        let statuses = self.statuses(&submissions).await?;

        let summaries = submissions
            .into_iter()
            .map(|submission| {
                let status = statuses
                    .get(&submission.id)
                    .copied()
                    .unwrap_or(ResultStatus::Accepted);
                SubmissionSummary { submission, status }
            })
            .collect();
        Ok((summaries, total))
    }

    async fn has_passed(&self, user_id: i32, problem_id: i32) -> Result<bool, AppError> {
        let filter = SubmissionFilter {
            problem_id,
            contest_id: None,
            user_id: Some(user_id),
        };
        let (submissions, _) = self.store.list_submissions(filter, None).await?;
        if submissions.is_empty() {
            return Ok(false);
        }

        let statuses = self.statuses(&submissions).await?;
        Ok(submissions.iter().any(|s| {
            statuses
                .get(&s.id)
                .is_none_or(|status| *status == ResultStatus::Accepted)
        }))
    }

    /// Derived status per submission id. Submissions without result rows
    /// are absent from the map.
    async fn statuses(
        &self,
        submissions: &[SubmissionRecord],
    ) -> Result<HashMap<String, ResultStatus>, AppError> {
        let ids: Vec<String> = submissions.iter().map(|s| s.id.clone()).collect();
        let mut grouped: HashMap<String, Vec<ResultStatus>> = HashMap::new();
        for row in self.store.list_results_for(&ids).await? {
            grouped.entry(row.submission_id).or_default().push(row.status);
        }

        Ok(grouped
            .into_iter()
            .map(|(id, statuses)| (id, aggregate(statuses)))
            .collect())
    }

    async fn detail(&self, submission: SubmissionRecord) -> Result<SubmissionDetail, AppError> {
        let results = self.store.list_results(&submission.id).await?;
        Ok(SubmissionDetail {
            status: aggregate(results.iter().map(|r| r.status)),
            submission,
            results,
        })
    }

    async fn publish(
        &self,
        request: JudgeRequest,
        properties: MessageProperties,
    ) -> Result<(), MqError> {
        let message_id = properties.message_id.clone();
        let payload = serde_json::to_value(&request)?;
        self.channel
            .publish(&self.mq.exchange, &self.mq.submission_key, payload, properties)
            .await
            .inspect_err(|e| {
                warn!(message_id = %message_id, error = %e, "Failed to publish judge request");
            })
    }
}
