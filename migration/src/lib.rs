pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20261001_000001_sites;
mod m20261001_000002_site_daily;
mod m20261002_000001_slot_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_sites::Migration),
            Box::new(m20261001_000002_site_daily::Migration),
            Box::new(m20261002_000001_slot_settings::Migration),
        ]
    }
}
