use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::sale::{IvaRate, PaymentMethod};

/// One sold product line, embedded in the sale document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub product_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<Uuid>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub quantity: i32,
    /// VAT bracket this line falls under (0, 5 or 10 percent)
    pub iva_rate: IvaRate,
    /// VAT portion contained in `total_price`
    pub iva_amount: Decimal,
    /// VAT-inclusive line total
    pub total_price: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct LineItems(pub Vec<LineItem>);

/// One applied payment, embedded in the sale document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentEntry {
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct PaymentEntries(pub Vec<PaymentEntry>);

/// Per-bracket taxable bases and VAT amounts, derived from the line items.
/// Never mutated independently; recomputed whenever the item list is set.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct TaxTotals {
    pub gravada10: Decimal,
    pub gravada5: Decimal,
    pub exenta: Decimal,
    pub iva10: Decimal,
    pub iva5: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-facing order number, unique within `business_date`.
    /// Assigned once at creation, immutable afterwards.
    pub daily_id: i64,
    pub business_date: String,

    #[sea_orm(column_type = "Json")]
    pub products: LineItems,
    #[sea_orm(column_type = "Json")]
    pub payment: PaymentEntries,
    #[sea_orm(column_type = "Json")]
    pub totals: TaxTotals,

    pub total_amount: Decimal,
    pub ruc: String,
    pub customer_name: String,
    pub status: String,
    pub stage: String,
    pub mode: String,

    /// Monotonic: once true, never reverts.
    pub invoiced: bool,
    pub invoice_number: Option<String>,
    pub timbrado_number: Option<String>,
    pub timbrado_init: Option<DateTime<Utc>>,
    pub timbrado_id: Option<Uuid>,

    pub user_id: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::timbrado::Entity",
        from = "Column::TimbradoId",
        to = "super::timbrado::Column::Id"
    )]
    Timbrado,
}

impl Related<super::timbrado::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timbrado.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
