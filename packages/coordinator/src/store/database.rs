use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Language, ResultStatus, Snippet, Template};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use super::{
    ContestRecord, CreatedSubmission, JudgeStore, NewSubmission, NewTestRun, Page, ProblemRecord,
    ResultUpdate, StoreError, SubmissionFilter, SubmissionRecord, SubmissionResultRecord,
    TestRunKind, TestRunRecord, TestcaseRef,
};
use crate::entity::{
    contest, contest_problem, problem, problem_testcase, submission, submission_result,
    test_run_result,
};

/// [`JudgeStore`] backed by SeaORM.
#[derive(Clone)]
pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn corrupt(what: &'static str, id: impl ToString, err: serde_json::Error) -> StoreError {
    StoreError::Corrupt {
        what,
        id: id.to_string(),
        reason: err.to_string(),
    }
}

fn problem_record(model: problem::Model) -> Result<ProblemRecord, StoreError> {
    let id = model.id;
    let languages: Vec<Language> =
        serde_json::from_value(model.languages).map_err(|e| corrupt("problem", id, e))?;
    let templates: Vec<Template> =
        serde_json::from_value(model.template).map_err(|e| corrupt("problem", id, e))?;

    Ok(ProblemRecord {
        id,
        time_limit: model.time_limit.max(0) as u64,
        memory_limit: model.memory_limit.max(0) as u64,
        languages,
        templates,
        judge_mode: model.judge_mode,
    })
}

fn submission_record(model: submission::Model) -> Result<SubmissionRecord, StoreError> {
    let code: Vec<Snippet> =
        serde_json::from_value(model.code).map_err(|e| corrupt("submission", &model.id, e))?;

    Ok(SubmissionRecord {
        id: model.id,
        user_id: model.user_id,
        problem_id: model.problem_id,
        contest_id: model.contest_id,
        language: model.language,
        code,
        code_size: model.code_size,
        created_at: model.created_at,
    })
}

impl From<test_run_result::Model> for TestRunRecord {
    fn from(model: test_run_result::Model) -> Self {
        Self {
            testcase_id: model.testcase_id,
            status: model.status,
            cpu_time: model.cpu_time,
            memory_usage: model.memory_usage,
            output: model.output,
        }
    }
}

fn submission_condition(filter: SubmissionFilter) -> Condition {
    let mut cond = Condition::all().add(submission::Column::ProblemId.eq(filter.problem_id));
    if let Some(contest_id) = filter.contest_id {
        cond = cond.add(submission::Column::ContestId.eq(contest_id));
    }
    if let Some(user_id) = filter.user_id {
        cond = cond.add(submission::Column::UserId.eq(user_id));
    }
    cond
}

impl From<submission_result::Model> for SubmissionResultRecord {
    fn from(model: submission_result::Model) -> Self {
        Self {
            id: model.id,
            submission_id: model.submission_id,
            testcase_id: model.problem_testcase_id,
            status: model.status,
            cpu_time: model.cpu_time,
            memory_usage: model.memory_usage,
            output: model.output,
        }
    }
}

#[async_trait]
impl JudgeStore for DbStore {
    async fn find_problem(&self, id: i32) -> Result<Option<ProblemRecord>, StoreError> {
        problem::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(problem_record)
            .transpose()
    }

    async fn list_testcases(&self, problem_id: i32) -> Result<Vec<TestcaseRef>, StoreError> {
        let testcases = problem_testcase::Entity::find()
            .filter(problem_testcase::Column::ProblemId.eq(problem_id))
            .order_by_asc(problem_testcase::Column::Id)
            .all(&self.db)
            .await?;

        Ok(testcases
            .into_iter()
            .map(|tc| TestcaseRef {
                id: tc.id,
                is_hidden: tc.is_hidden,
            })
            .collect())
    }

    async fn find_contest(&self, id: i32) -> Result<Option<ContestRecord>, StoreError> {
        Ok(contest::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|c| ContestRecord {
                id: c.id,
                start_time: c.start_time,
                end_time: c.end_time,
            }))
    }

    async fn is_problem_in_contest(
        &self,
        contest_id: i32,
        problem_id: i32,
    ) -> Result<bool, StoreError> {
        let exists = contest_problem::Entity::find()
            .filter(contest_problem::Column::ContestId.eq(contest_id))
            .filter(contest_problem::Column::ProblemId.eq(problem_id))
            .one(&self.db)
            .await?
            .is_some();
        Ok(exists)
    }

    async fn create_submission(
        &self,
        new: NewSubmission,
    ) -> Result<CreatedSubmission, StoreError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let model = submission::ActiveModel {
            id: Set(new.id),
            user_id: Set(new.user_id),
            problem_id: Set(new.problem_id),
            contest_id: Set(new.contest_id),
            language: Set(new.language),
            code: Set(serde_json::to_value(&new.code)?),
            code_size: Set(new.code_size),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut result_ids = Vec::with_capacity(new.testcase_ids.len());
        for &testcase_id in &new.testcase_ids {
            let row = submission_result::ActiveModel {
                submission_id: Set(model.id.clone()),
                problem_testcase_id: Set(testcase_id),
                status: Set(ResultStatus::Judging),
                cpu_time: Set(None),
                memory_usage: Set(None),
                output: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            result_ids.push(row.id);
        }

        // Dropping `txn` on any error above rolls the submission back too.
        txn.commit().await?;
        debug!(submission_id = %model.id, rows = result_ids.len(), "Created submission");

        Ok(CreatedSubmission {
            submission: submission_record(model)?,
            result_ids,
        })
    }

    async fn find_submission(&self, id: &str) -> Result<Option<SubmissionRecord>, StoreError> {
        submission::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(submission_record)
            .transpose()
    }

    async fn list_submissions(
        &self,
        filter: SubmissionFilter,
        page: Option<Page>,
    ) -> Result<(Vec<SubmissionRecord>, u64), StoreError> {
        let query = submission::Entity::find().filter(submission_condition(filter));
        let total = query.clone().count(&self.db).await?;

        let mut query = query
            .order_by_desc(submission::Column::CreatedAt)
            .order_by_desc(submission::Column::Id);
        if let Some(page) = page {
            query = query.offset(page.skip).limit(page.take);
        }

        let submissions = query
            .all(&self.db)
            .await?
            .into_iter()
            .map(submission_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((submissions, total))
    }

    async fn apply_result(&self, result_id: i64, update: ResultUpdate) -> Result<bool, StoreError> {
        let row = submission_result::ActiveModel {
            id: Set(result_id),
            status: Set(update.status),
            cpu_time: Set(update.cpu_time),
            memory_usage: Set(update.memory_usage),
            output: Set(update.output),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        match row.update(&self.db).await {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotUpdated) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_results(
        &self,
        submission_id: &str,
    ) -> Result<Vec<SubmissionResultRecord>, StoreError> {
        let rows = submission_result::Entity::find()
            .filter(submission_result::Column::SubmissionId.eq(submission_id))
            .order_by_asc(submission_result::Column::ProblemTestcaseId)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(SubmissionResultRecord::from).collect())
    }

    async fn list_results_for(
        &self,
        submission_ids: &[String],
    ) -> Result<Vec<SubmissionResultRecord>, StoreError> {
        if submission_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = submission_result::Entity::find()
            .filter(submission_result::Column::SubmissionId.is_in(submission_ids.iter().cloned()))
            .order_by_asc(submission_result::Column::SubmissionId)
            .order_by_asc(submission_result::Column::ProblemTestcaseId)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(SubmissionResultRecord::from).collect())
    }

    async fn begin_test_run(&self, run: NewTestRun, now: DateTime<Utc>) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        let stale = Condition::any()
            .add(
                Condition::all()
                    .add(test_run_result::Column::UserId.eq(run.user_id))
                    .add(test_run_result::Column::Kind.eq(run.kind)),
            )
            .add(test_run_result::Column::ExpiresAt.lte(now));
        let purged = test_run_result::Entity::delete_many()
            .filter(stale)
            .exec(&txn)
            .await?
            .rows_affected;

        for &testcase_id in &run.testcase_ids {
            test_run_result::ActiveModel {
                user_id: Set(run.user_id),
                kind: Set(run.kind),
                run_id: Set(run.run_id.clone()),
                testcase_id: Set(testcase_id),
                status: Set(ResultStatus::Judging),
                cpu_time: Set(None),
                memory_usage: Set(None),
                output: Set(None),
                expires_at: Set(run.expires_at),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        debug!(user_id = run.user_id, run_id = %run.run_id, purged, "Started test run");
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
        let changes = test_run_result::ActiveModel {
            status: Set(update.status),
            cpu_time: Set(update.cpu_time),
            memory_usage: Set(update.memory_usage),
            output: Set(update.output),
            ..Default::default()
        };

        let updated = test_run_result::Entity::update_many()
            .set(changes)
            .filter(test_run_result::Column::UserId.eq(user_id))
            .filter(test_run_result::Column::Kind.eq(kind))
            .filter(test_run_result::Column::RunId.eq(run_id))
            .filter(test_run_result::Column::TestcaseId.eq(testcase_id))
            .filter(test_run_result::Column::ExpiresAt.gt(now))
            .exec(&self.db)
            .await?
            .rows_affected;
        Ok(updated > 0)
    }

    async fn list_test_results(
        &self,
        user_id: i32,
        kind: TestRunKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<TestRunRecord>, StoreError> {
        let rows = test_run_result::Entity::find()
            .filter(test_run_result::Column::UserId.eq(user_id))
            .filter(test_run_result::Column::Kind.eq(kind))
            .filter(test_run_result::Column::ExpiresAt.gt(now))
            .order_by_asc(test_run_result::Column::TestcaseId)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(TestRunRecord::from).collect())
    }
}
