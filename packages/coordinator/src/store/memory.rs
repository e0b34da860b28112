use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ResultStatus;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{
    ContestRecord, CreatedSubmission, JudgeStore, NewSubmission, NewTestRun, Page, ProblemRecord,
    ResultUpdate, StoreError, SubmissionFilter, SubmissionRecord, SubmissionResultRecord,
    TestRunKind, TestRunRecord, TestcaseRef,
};

/// In-process [`JudgeStore`] for tests and local runs without a database.
///
/// Cloning shares the underlying state, so several coordinators built over
/// clones of one store behave like instances sharing a database.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    test_runs: Arc<DashMap<(i32, TestRunKind), TestRun>>,
    failing: Arc<AtomicBool>,
}

#[derive(Default)]
struct State {
    problems: HashMap<i32, ProblemRecord>,
    testcases: HashMap<i32, Vec<TestcaseRef>>,
    contests: HashMap<i32, ContestRecord>,
    contest_problems: HashSet<(i32, i32)>,
    submissions: HashMap<String, SubmissionRecord>,
    results: BTreeMap<i64, SubmissionResultRecord>,
    next_result_id: i64,
}

struct TestRun {
    run_id: String,
    expires_at: DateTime<Utc>,
    results: Vec<TestRunRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_problem(&self, problem: ProblemRecord) {
        self.state.lock().await.problems.insert(problem.id, problem);
    }

    pub async fn insert_testcase(&self, problem_id: i32, testcase: TestcaseRef) {
        let mut state = self.state.lock().await;
        let testcases = state.testcases.entry(problem_id).or_default();
        testcases.push(testcase);
        testcases.sort_by_key(|tc| tc.id);
    }

    pub async fn insert_contest(&self, contest: ContestRecord) {
        self.state.lock().await.contests.insert(contest.id, contest);
    }

    pub async fn add_contest_problem(&self, contest_id: i32, problem_id: i32) {
        self.state
            .lock()
            .await
            .contest_problems
            .insert((contest_id, problem_id));
    }

    /// All result rows, ordered by id.
    pub async fn results(&self) -> Vec<SubmissionResultRecord> {
        self.state.lock().await.results.values().cloned().collect()
    }

    pub async fn submission_count(&self) -> usize {
        self.state.lock().await.submissions.len()
    }

    /// Make every write fail with [`StoreError::Unavailable`], as if the
    /// database had gone away. Reads keep working.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is failing".into()));
        }
        Ok(())
    }
}

fn filter_matches(filter: &SubmissionFilter, s: &SubmissionRecord) -> bool {
    s.problem_id == filter.problem_id
        && filter.contest_id.is_none_or(|id| s.contest_id == Some(id))
        && filter.user_id.is_none_or(|id| s.user_id == id)
}

#[async_trait]
impl JudgeStore for MemoryStore {
    async fn find_problem(&self, id: i32) -> Result<Option<ProblemRecord>, StoreError> {
        Ok(self.state.lock().await.problems.get(&id).cloned())
    }

    async fn list_testcases(&self, problem_id: i32) -> Result<Vec<TestcaseRef>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .testcases
            .get(&problem_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_contest(&self, id: i32) -> Result<Option<ContestRecord>, StoreError> {
        Ok(self.state.lock().await.contests.get(&id).cloned())
    }

    async fn is_problem_in_contest(
        &self,
        contest_id: i32,
        problem_id: i32,
    ) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .contest_problems
            .contains(&(contest_id, problem_id)))
    }

    async fn create_submission(
        &self,
        new: NewSubmission,
    ) -> Result<CreatedSubmission, StoreError> {
        self.check_available()?;

        let mut unique = HashSet::new();
        if let Some(dup) = new.testcase_ids.iter().find(|id| !unique.insert(**id)) {
            return Err(StoreError::Unavailable(format!(
                "duplicate result row for test case {dup}"
            )));
        }

        let mut state = self.state.lock().await;
        if state.submissions.contains_key(&new.id) {
            return Err(StoreError::Unavailable(format!(
                "submission {} already exists",
                new.id
            )));
        }

        let submission = SubmissionRecord {
            id: new.id,
            user_id: new.user_id,
            problem_id: new.problem_id,
            contest_id: new.contest_id,
            language: new.language,
            code: new.code,
            code_size: new.code_size,
            created_at: Utc::now(),
        };

        let mut result_ids = Vec::with_capacity(new.testcase_ids.len());
        for testcase_id in new.testcase_ids {
            state.next_result_id += 1;
            let id = state.next_result_id;
            state.results.insert(
                id,
                SubmissionResultRecord {
                    id,
                    submission_id: submission.id.clone(),
                    testcase_id,
                    status: ResultStatus::Judging,
                    cpu_time: None,
                    memory_usage: None,
                    output: None,
                },
            );
            result_ids.push(id);
        }
        state
            .submissions
            .insert(submission.id.clone(), submission.clone());

        Ok(CreatedSubmission {
            submission,
            result_ids,
        })
    }

    async fn find_submission(&self, id: &str) -> Result<Option<SubmissionRecord>, StoreError> {
        Ok(self.state.lock().await.submissions.get(id).cloned())
    }

    async fn list_submissions(
        &self,
        filter: SubmissionFilter,
        page: Option<Page>,
    ) -> Result<(Vec<SubmissionRecord>, u64), StoreError> {
        let state = self.state.lock().await;
        let mut found: Vec<_> = state
            .submissions
            .values()
            .filter(|s| filter_matches(&filter, s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        let total = found.len() as u64;
        if let Some(page) = page {
            let skip = usize::try_from(page.skip).unwrap_or(usize::MAX);
            let take = usize::try_from(page.take).unwrap_or(usize::MAX);
            found = found.into_iter().skip(skip).take(take).collect();
        }
        Ok((found, total))
    }

    async fn apply_result(&self, result_id: i64, update: ResultUpdate) -> Result<bool, StoreError> {
        self.check_available()?;

        let mut state = self.state.lock().await;
        let Some(row) = state.results.get_mut(&result_id) else {
            return Ok(false);
        };
        row.status = update.status;
        row.cpu_time = update.cpu_time;
        row.memory_usage = update.memory_usage;
        row.output = update.output;
        Ok(true)
    }

    async fn list_results(
        &self,
        submission_id: &str,
    ) -> Result<Vec<SubmissionResultRecord>, StoreError> {
        let mut rows: Vec<_> = self
            .state
            .lock()
            .await
            .results
            .values()
            .filter(|r| r.submission_id == submission_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.testcase_id);
        Ok(rows)
    }

    async fn list_results_for(
        &self,
        submission_ids: &[String],
    ) -> Result<Vec<SubmissionResultRecord>, StoreError> {
        let mut rows: Vec<_> = self
            .state
            .lock()
            .await
            .results
            .values()
            .filter(|r| submission_ids.contains(&r.submission_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.submission_id
                .cmp(&b.submission_id)
                .then(a.testcase_id.cmp(&b.testcase_id))
        });
        Ok(rows)
    }

    async fn begin_test_run(&self, run: NewTestRun, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.check_available()?;

        self.test_runs.retain(|_, existing| existing.expires_at > now);
        let mut results: Vec<_> = run
            .testcase_ids
            .iter()
            .map(|&id| TestRunRecord::judging(id))
            .collect();
        results.sort_by_key(|r| r.testcase_id);

        self.test_runs.insert(
            (run.user_id, run.kind),
            TestRun {
                run_id: run.run_id,
                expires_at: run.expires_at,
                results,
            },
        );
        Ok(())
    }

    async fn apply_test_result(
        &self,
        user_id: i32,
        kind: TestRunKind,
        run_id: &str,
        testcase_id: i32,
        update: ResultUpdate,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.check_available()?;

        let Some(mut run) = self.test_runs.get_mut(&(user_id, kind)) else {
            return Ok(false);
        };
        if run.run_id != run_id || run.expires_at <= now {
            return Ok(false);
        }
        let Some(row) = run.results.iter_mut().find(|r| r.testcase_id == testcase_id) else {
            return Ok(false);
        };
        row.status = update.status;
        row.cpu_time = update.cpu_time;
        row.memory_usage = update.memory_usage;
        row.output = update.output;
        Ok(true)
    }

    async fn list_test_results(
        &self,
        user_id: i32,
        kind: TestRunKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<TestRunRecord>, StoreError> {
        Ok(self
            .test_runs
            .get(&(user_id, kind))
            .filter(|run| run.expires_at > now)
            .map(|run| run.results.clone())
            .unwrap_or_default())
    }
}
