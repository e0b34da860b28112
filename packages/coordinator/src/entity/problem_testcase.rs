use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem_testcase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub input: String,
    #[sea_orm(column_type = "Text")]
    pub output: String,
    /// Hidden cases are judged but never run for test runs.
    #[sea_orm(default_value = false)]
    pub is_hidden: bool,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    #[sea_orm(has_many)]
    pub results: HasMany<super::submission_result::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
