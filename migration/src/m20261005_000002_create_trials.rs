use sea_orm_migration::{prelude::*, sea_orm::ConnectionTrait};

use super::m20261005_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Trials::Table)
          .if_not_exists()
          .col(ColumnDef::new(Trials::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Trials::UserId).string().not_null())
          .col(ColumnDef::new(Trials::Plan).string().not_null())
          .col(
            ColumnDef::new(Trials::Status)
              .string()
              .not_null()
              .default("active"),
          )
          .col(ColumnDef::new(Trials::StartDate).date_time().not_null())
          .col(ColumnDef::new(Trials::EndDate).date_time().not_null())
          .col(ColumnDef::new(Trials::Features).json().not_null())
          .col(ColumnDef::new(Trials::UsageStats).json().not_null())
          .col(ColumnDef::new(Trials::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Trials::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_trials_user")
              .from(Trials::Table, Trials::UserId)
              .to(Users::Table, Users::Uid)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_trials_user")
          .table(Trials::Table)
          .col(Trials::UserId)
          .to_owned(),
      )
      .await?;

    // At most one active trial per user, enforced by the database.
    manager
      .get_connection()
      .execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS ux_trials_active_user \
         ON trials (user_id) WHERE status = 'active'",
      )
      .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Trials::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Trials {
  Table,
  Id,
  UserId,
  Plan,
  Status,
  StartDate,
  EndDate,
  Features,
  UsageStats,
  CreatedAt,
  UpdatedAt,
}
