use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Timbrados::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Timbrados::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Timbrados::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Timbrados::IssuedAt).timestamp().not_null())
                    .col(ColumnDef::new(Timbrados::ExpiresAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Timbrados::Establishment)
                            .string()
                            .not_null()
                            .default("001"),
                    )
                    .col(
                        ColumnDef::new(Timbrados::Branch)
                            .string()
                            .not_null()
                            .default("001"),
                    )
                    .col(
                        ColumnDef::new(Timbrados::LastInvoiceNumber)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Timbrados::MaxInvoices)
                            .big_integer()
                            .not_null()
                            .default(999999),
                    )
                    .col(ColumnDef::new(Timbrados::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Active-window lookup runs on every invoicing request
        manager
            .create_index(
                Index::create()
                    .name("idx_timbrados_issued_expires")
                    .table(Timbrados::Table)
                    .col(Timbrados::IssuedAt)
                    .col(Timbrados::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Timbrados::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Timbrados {
    Table,
    Id,
    Code,
    IssuedAt,
    ExpiresAt,
    Establishment,
    Branch,
    LastInvoiceNumber,
    MaxInvoices,
    CreatedAt,
}
