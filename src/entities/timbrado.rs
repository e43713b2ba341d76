use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fiscal authorization window. At most one window may cover any given
/// instant; enforced at registration time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "timbrados")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// 8-digit authorization code issued by the tax authority
    #[sea_orm(unique)]
    pub code: String,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// 3-digit invoice-number prefixes
    pub establishment: String,
    pub branch: String,

    /// Internal correlative; incremented only by invoice issuance.
    pub last_invoice_number: i64,
    pub max_invoices: i64,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale::Entity")]
    Sales,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether `now` falls inside the validity window.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.issued_at && now <= self.expires_at
    }
}
