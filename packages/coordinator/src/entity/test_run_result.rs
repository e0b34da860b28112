use common::ResultStatus;
use sea_orm::entity::prelude::*;

use crate::store::TestRunKind;

/// One test case of a user's live test run. Rows are replaced wholesale when
/// the user starts another run of the same kind.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "test_run_result")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique_key = "user_run_testcase")]
    pub user_id: i32,
    #[sea_orm(unique_key = "user_run_testcase")]
    pub kind: TestRunKind,
    pub run_id: String,
    /// A problem test case id, or the user's own label for user test cases.
    #[sea_orm(unique_key = "user_run_testcase")]
    pub testcase_id: i32,

    pub status: ResultStatus,
    pub cpu_time: Option<i64>,
    pub memory_usage: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub output: Option<String>,

    pub expires_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
