use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Keyed by calendar day (YYYY-MM-DD); incremented atomically on
        // every sale creation, never decremented.
        manager
            .create_table(
                Table::create()
                    .table(DailyCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyCounters::Date)
                            .string()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailyCounters::Seq)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DailyCounters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum DailyCounters {
    Table,
    Date,
    Seq,
}
