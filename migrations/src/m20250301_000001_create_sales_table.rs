use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Sales::DailyId).big_integer().not_null())
                    .col(ColumnDef::new(Sales::BusinessDate).string().not_null())
                    .col(ColumnDef::new(Sales::Products).json().not_null())
                    .col(ColumnDef::new(Sales::Payment).json().not_null())
                    .col(ColumnDef::new(Sales::Totals).json().not_null())
                    .col(
                        ColumnDef::new(Sales::TotalAmount)
                            .decimal()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Sales::Ruc).string().not_null())
                    .col(ColumnDef::new(Sales::CustomerName).string().not_null())
                    .col(
                        ColumnDef::new(Sales::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Sales::Stage)
                            .string()
                            .not_null()
                            .default("processed"),
                    )
                    .col(
                        ColumnDef::new(Sales::Mode)
                            .string()
                            .not_null()
                            .default("local"),
                    )
                    .col(
                        ColumnDef::new(Sales::Invoiced)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Sales::InvoiceNumber).string().null())
                    .col(ColumnDef::new(Sales::TimbradoNumber).string().null())
                    .col(ColumnDef::new(Sales::TimbradoInit).timestamp().null())
                    .col(ColumnDef::new(Sales::TimbradoId).uuid().null())
                    .col(ColumnDef::new(Sales::UserId).string().not_null())
                    .col(ColumnDef::new(Sales::Date).timestamp().not_null())
                    .col(ColumnDef::new(Sales::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Sales::UpdatedAt).timestamp().null())
                    .col(
                        ColumnDef::new(Sales::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .to_owned(),
            )
            .await?;

        // One order number per business day
        manager
            .create_index(
                Index::create()
                    .name("idx_sales_business_date_daily_id")
                    .table(Sales::Table)
                    .col(Sales::BusinessDate)
                    .col(Sales::DailyId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_status")
                    .table(Sales::Table)
                    .col(Sales::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Sales {
    Table,
    Id,
    DailyId,
    BusinessDate,
    Products,
    Payment,
    Totals,
    TotalAmount,
    Ruc,
    CustomerName,
    Status,
    Stage,
    Mode,
    Invoiced,
    InvoiceNumber,
    TimbradoNumber,
    TimbradoInit,
    TimbradoId,
    UserId,
    Date,
    CreatedAt,
    UpdatedAt,
    Version,
}
