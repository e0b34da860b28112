use common::Language;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    /// Opaque, generated at creation.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: i32,

    pub problem_id: i32,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    /// NULL for standalone submissions.
    pub contest_id: Option<i32>,
    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,

    pub language: Language,
    /// Snippets as submitted, stored as a JSON array of {id, text, locked}.
    #[sea_orm(column_type = "JsonBinary")]
    pub code: serde_json::Value,
    /// Bytes of the flattened code.
    pub code_size: i32,

    #[sea_orm(has_many)]
    pub results: HasMany<super::submission_result::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
