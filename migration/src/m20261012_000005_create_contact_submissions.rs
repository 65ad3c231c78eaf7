use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ContactSubmissions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ContactSubmissions::Id)
              .string()
              .not_null()
              .primary_key(),
          )
          .col(ColumnDef::new(ContactSubmissions::Name).string().not_null())
          .col(ColumnDef::new(ContactSubmissions::Email).string().not_null())
          .col(ColumnDef::new(ContactSubmissions::Company).string().null())
          .col(ColumnDef::new(ContactSubmissions::Subject).string().null())
          .col(ColumnDef::new(ContactSubmissions::Message).text().not_null())
          .col(
            ColumnDef::new(ContactSubmissions::CreatedAt).date_time().not_null(),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ContactSubmissions::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ContactSubmissions {
  Table,
  Id,
  Name,
  Email,
  Company,
  Subject,
  Message,
  CreatedAt,
}
