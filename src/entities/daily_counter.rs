use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-day order-number counter, keyed by the business date (`YYYY-MM-DD`).
/// Created lazily on the first sale of a day and only ever incremented.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: String,
    pub seq: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
