pub use sea_orm_migration::prelude::*;

mod m20261005_000001_create_users;
mod m20261005_000002_create_trials;
mod m20261005_000003_create_trial_extensions;
mod m20261012_000004_create_subscriptions;
mod m20261012_000005_create_contact_submissions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20261005_000001_create_users::Migration),
      Box::new(m20261005_000002_create_trials::Migration),
      Box::new(m20261005_000003_create_trial_extensions::Migration),
      Box::new(m20261012_000004_create_subscriptions::Migration),
      Box::new(m20261012_000005_create_contact_submissions::Migration),
    ]
  }
}
