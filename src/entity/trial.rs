//! Trial entity - one time-boxed plan grant per user

use std::{collections::BTreeMap, fmt, str::FromStr};

use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  Hash,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Plan {
  #[sea_orm(string_value = "free")]
  Free,
  #[sea_orm(string_value = "professional")]
  Professional,
  #[sea_orm(string_value = "enterprise")]
  Enterprise,
}

impl Plan {
  pub fn as_str(&self) -> &'static str {
    match self {
      Plan::Free => "free",
      Plan::Professional => "professional",
      Plan::Enterprise => "enterprise",
    }
  }

  /// Only paid tiers can be trialled or purchased.
  pub fn is_paid(&self) -> bool {
    !matches!(self, Plan::Free)
  }

  pub fn next(&self) -> Option<Plan> {
    match self {
      Plan::Free => Some(Plan::Professional),
      Plan::Professional => Some(Plan::Enterprise),
      Plan::Enterprise => None,
    }
  }
}

impl fmt::Display for Plan {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Plan {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "free" => Ok(Plan::Free),
      "professional" => Ok(Plan::Professional),
      "enterprise" => Ok(Plan::Enterprise),
      other => Err(Error::Validation(format!("unknown plan `{other}`"))),
    }
  }
}

#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
  #[sea_orm(string_value = "active")]
  Active,
  #[sea_orm(string_value = "expired")]
  Expired,
  #[sea_orm(string_value = "cancelled")]
  Cancelled,
  #[sea_orm(string_value = "converted")]
  Converted,
}

impl fmt::Display for TrialStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      TrialStatus::Active => "active",
      TrialStatus::Expired => "expired",
      TrialStatus::Cancelled => "cancelled",
      TrialStatus::Converted => "converted",
    })
  }
}

/// Feature flags granted by the trial, fixed at creation.
#[derive(
  Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct Features(pub BTreeMap<String, bool>);

impl Features {
  pub fn enabled(&self, feature: &str) -> bool {
    self.0.get(feature).copied().unwrap_or(false)
  }
}

#[derive(
  Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
  pub invoices_created: u64,
  pub customers_added: u64,
  pub payments_processed: u64,
  pub reports_generated: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UsageCounter {
  InvoicesCreated,
  CustomersAdded,
  PaymentsProcessed,
  ReportsGenerated,
}

impl UsageStats {
  pub fn bump(&mut self, counter: UsageCounter, amount: u64) {
    let slot = match counter {
      UsageCounter::InvoicesCreated => &mut self.invoices_created,
      UsageCounter::CustomersAdded => &mut self.customers_added,
      UsageCounter::PaymentsProcessed => &mut self.payments_processed,
      UsageCounter::ReportsGenerated => &mut self.reports_generated,
    };
    *slot = slot.saturating_add(amount);
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trials")]
#[serde(rename_all = "camelCase")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub user_id: String,
  pub plan: Plan,
  pub status: TrialStatus,
  pub start_date: DateTime,
  pub end_date: DateTime,
  pub features: Features,
  pub usage_stats: UsageStats,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::UserId",
    to = "super::user::Column::Uid"
  )]
  User,
  #[sea_orm(has_many = "super::trial_extension::Entity")]
  Extensions,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl Related<super::trial_extension::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Extensions.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
