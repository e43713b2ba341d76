pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_sales_table;
mod m20250301_000002_create_timbrados_table;
mod m20250301_000003_create_daily_counters_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_sales_table::Migration),
            Box::new(m20250301_000002_create_timbrados_table::Migration),
            Box::new(m20250301_000003_create_daily_counters_table::Migration),
        ]
    }
}
