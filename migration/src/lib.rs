pub use sea_orm_migration::prelude::*;

pub mod schema;

mod m20261016_000001_create_crypto_prices;
mod m20261016_000002_create_crypto_market_snapshots;
mod m20261016_000003_create_job_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261016_000001_create_crypto_prices::Migration),
            Box::new(m20261016_000002_create_crypto_market_snapshots::Migration),
            Box::new(m20261016_000003_create_job_status::Migration),
        ]
    }
}
