use common::ResultStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission_result")]
pub struct Model {
    /// Doubles as the message id of the judge request for this row.
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique_key = "submission_testcase")]
    pub submission_id: String,
    #[sea_orm(unique_key = "submission_testcase")]
    pub problem_testcase_id: i32,

    pub status: ResultStatus,
    pub cpu_time: Option<i64>,     // in milliseconds
    pub memory_usage: Option<i64>, // in bytes
    #[sea_orm(column_type = "Text", nullable)]
    pub output: Option<String>,

    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,
    #[sea_orm(belongs_to, from = "problem_testcase_id", to = "id")]
    pub testcase: HasOne<super::problem_testcase::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
