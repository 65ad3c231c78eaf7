use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit row written by every trial extension.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trial_extensions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub trial_id: String,
  pub days: i64,
  pub reason: Option<String>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::trial::Entity",
    from = "Column::TrialId",
    to = "super::trial::Column::Id"
  )]
  Trial,
}

impl Related<super::trial::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Trial.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
