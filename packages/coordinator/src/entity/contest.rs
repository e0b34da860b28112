use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,

    #[sea_orm(has_many, via = "contest_problem")]
    pub problems: HasMany<super::problem::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::submission::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
