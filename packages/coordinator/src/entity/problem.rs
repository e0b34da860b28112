use common::JudgeMode;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub time_limit: i32,   // in milliseconds
    pub memory_limit: i32, // in megabytes

    /// Allowed languages, a JSON array of language names.
    #[sea_orm(column_type = "JsonBinary")]
    pub languages: serde_json::Value,
    /// Starter code per language, a JSON array of {language, code}.
    #[sea_orm(column_type = "JsonBinary")]
    pub template: serde_json::Value,
    pub judge_mode: JudgeMode,

    #[sea_orm(has_many)]
    pub testcases: HasMany<super::problem_testcase::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,

    #[sea_orm(has_many, via = "contest_problem")]
    pub contests: HasMany<super::contest::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
