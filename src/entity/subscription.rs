use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::Plan;
use crate::error::Error;

#[derive(
  Clone,
  Copy,
  Debug,
  Default,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
  #[default]
  #[sea_orm(string_value = "monthly")]
  Monthly,
  #[sea_orm(string_value = "yearly")]
  Yearly,
}

impl BillingInterval {
  pub fn as_str(&self) -> &'static str {
    match self {
      BillingInterval::Monthly => "monthly",
      BillingInterval::Yearly => "yearly",
    }
  }
}

impl fmt::Display for BillingInterval {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BillingInterval {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "monthly" | "month" => Ok(BillingInterval::Monthly),
      "yearly" | "year" | "annual" => Ok(BillingInterval::Yearly),
      other => Err(Error::Validation(format!("unknown interval `{other}`"))),
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub user_id: String,
  pub trial_id: Option<String>,
  pub plan: Plan,
  pub interval: BillingInterval,
  pub amount_cents: i64,
  pub currency: String,
  pub transaction_id: String,
  pub promo_code: Option<String>,
  pub current_period_end: DateTime,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::UserId",
    to = "super::user::Column::Uid"
  )]
  User,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
