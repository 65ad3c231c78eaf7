use sea_orm_migration::prelude::*;

use super::m20261005_000002_create_trials::Trials;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(TrialExtensions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(TrialExtensions::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(TrialExtensions::TrialId).string().not_null())
          .col(ColumnDef::new(TrialExtensions::Days).big_integer().not_null())
          .col(ColumnDef::new(TrialExtensions::Reason).string().null())
          .col(ColumnDef::new(TrialExtensions::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_trial_extensions_trial")
              .from(TrialExtensions::Table, TrialExtensions::TrialId)
              .to(Trials::Table, Trials::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(TrialExtensions::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum TrialExtensions {
  Table,
  Id,
  TrialId,
  Days,
  Reason,
  CreatedAt,
}
