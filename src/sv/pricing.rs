//! Pricing catalog: plan metadata, promo codes and checkout links.
//!
//! Owned by `AppState` and read-only after startup. Money is in cents;
//! `yearly_price_cents` is the per-month price when billed yearly.

use std::collections::BTreeMap;

use reqwest::Url;
use serde::Serialize;

use crate::{
  entity::{BillingInterval, Features, Plan, UsageStats},
  prelude::*,
};

/// Share of a plan limit at which an upgrade is suggested.
const USAGE_THRESHOLD_PERCENT: u64 = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
  /// `None` means unlimited.
  pub invoices_per_month: Option<u64>,
  pub customers: Option<u64>,
  pub team_members: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInfo {
  pub id: Plan,
  pub name: &'static str,
  pub description: &'static str,
  pub monthly_price_cents: i64,
  pub yearly_price_cents: i64,
  pub features: Vec<&'static str>,
  pub limits: Limits,
  pub trial_days: i64,
  pub popular: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
  pub code: &'static str,
  pub percent_off: u8,
  pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRecommendation {
  pub plan: Plan,
  pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOption {
  #[serde(flatten)]
  pub plan: PlanInfo,
  pub yearly_savings_cents: i64,
  pub recommended: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialValue {
  pub days: i64,
  pub value_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
  Low,
  Medium,
  High,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOffer {
  pub upgrade_options: Vec<UpgradeOption>,
  pub promo_codes: Vec<PromoCode>,
  pub trial_value: TrialValue,
  pub urgency: Urgency,
}

const FREE_FEATURES: &[&str] = &["invoices", "pdf_export", "basic_templates"];

const PROFESSIONAL_FEATURES: &[&str] = &[
  "unlimited_invoices",
  "custom_branding",
  "recurring_invoices",
  "payment_reminders",
  "multi_currency",
  "advanced_reports",
  "ai_form_fill",
];

const ENTERPRISE_FEATURES: &[&str] = &[
  "team_collaboration",
  "api_access",
  "white_label",
  "priority_support",
  "dedicated_manager",
];

#[derive(Debug, Clone)]
pub struct Catalog {
  /// Indexed by `Plan as usize`.
  plans: [PlanInfo; 3],
  promos: Vec<PromoCode>,
  base_url: Url,
}

impl Catalog {
  pub fn standard(base_url: Url, trial_days: i64) -> Self {
    let professional: Vec<_> =
      FREE_FEATURES.iter().chain(PROFESSIONAL_FEATURES).copied().collect();
    let enterprise: Vec<_> =
      professional.iter().chain(ENTERPRISE_FEATURES).copied().collect();

    let plans = [
      PlanInfo {
        id: Plan::Free,
        name: "Free",
        description: "Send your first invoices",
        monthly_price_cents: 0,
        yearly_price_cents: 0,
        features: FREE_FEATURES.to_vec(),
        limits: Limits {
          invoices_per_month: Some(5),
          customers: Some(10),
          team_members: Some(1),
        },
        trial_days: 0,
        popular: false,
      },
      PlanInfo {
        id: Plan::Professional,
        name: "Professional",
        description: "Everything a growing business needs",
        monthly_price_cents: 2900,
        yearly_price_cents: 2400,
        features: professional,
        limits: Limits {
          invoices_per_month: None,
          customers: Some(500),
          team_members: Some(3),
        },
        trial_days,
        popular: true,
      },
      PlanInfo {
        id: Plan::Enterprise,
        name: "Enterprise",
        description: "Teams, integrations and dedicated support",
        monthly_price_cents: 9900,
        yearly_price_cents: 7900,
        features: enterprise,
        limits: Limits {
          invoices_per_month: None,
          customers: None,
          team_members: None,
        },
        trial_days,
        popular: false,
      },
    ];

    let promos = vec![
      PromoCode {
        code: "TRIAL20",
        percent_off: 20,
        description: "20% off when upgrading from a trial",
      },
      PromoCode {
        code: "EARLYBIRD25",
        percent_off: 25,
        description: "25% off for upgrading a week before the trial ends",
      },
    ];

    Self { plans, promos, base_url }
  }

  pub fn info(&self, plan: Plan) -> &PlanInfo {
    &self.plans[plan as usize]
  }

  /// Unknown ids are `None`, not an error.
  pub fn plan(&self, id: &str) -> Option<&PlanInfo> {
    id.parse::<Plan>().ok().map(|plan| self.info(plan))
  }

  pub fn plans(&self) -> &[PlanInfo] {
    &self.plans
  }

  pub fn yearly_savings(&self, id: &str) -> Option<i64> {
    self.plan(id).map(savings)
  }

  /// Amount charged per billing period.
  pub fn price(&self, plan: Plan, interval: BillingInterval) -> i64 {
    let info = self.info(plan);
    match interval {
      BillingInterval::Monthly => info.monthly_price_cents,
      BillingInterval::Yearly => info.yearly_price_cents * 12,
    }
  }

  pub fn checkout_url(
    &self,
    plan: Plan,
    interval: BillingInterval,
    user_id: &str,
  ) -> Result<Url> {
    let (path, params) = match plan {
      Plan::Free => ("signup", vec![("plan", plan.as_str())]),
      Plan::Enterprise => (
        "contact",
        vec![
          ("plan", plan.as_str()),
          ("interval", interval.as_str()),
          ("user", user_id),
          ("topic", "sales"),
        ],
      ),
      Plan::Professional => (
        "checkout",
        vec![
          ("plan", plan.as_str()),
          ("interval", interval.as_str()),
          ("user", user_id),
        ],
      ),
    };

    let mut url = self
      .base_url
      .join(path)
      .map_err(|err| Error::Internal(format!("Bad base url: {err}")))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url)
  }

  pub fn can_access_feature(&self, plan: Plan, feature: &str) -> bool {
    self.info(plan).features.contains(&feature)
  }

  /// Flag map over every known feature, enabled where `plan` includes it.
  pub fn features_for(&self, plan: Plan) -> Features {
    let map: BTreeMap<_, _> = self
      .plans
      .iter()
      .flat_map(|info| info.features.iter())
      .map(|&feature| {
        (feature.to_string(), self.can_access_feature(plan, feature))
      })
      .collect();
    Features(map)
  }

  pub fn upgrade_recommendation(
    &self,
    plan: Plan,
    usage: &UsageStats,
  ) -> Option<PlanRecommendation> {
    let next = plan.next()?;
    let limits = &self.info(plan).limits;

    let checks = [
      ("invoices", usage.invoices_created, limits.invoices_per_month),
      ("customers", usage.customers_added, limits.customers),
    ];

    checks.into_iter().find_map(|(what, used, limit)| {
      let limit = limit?;
      let reached = u128::from(used) * 100
        >= u128::from(limit) * u128::from(USAGE_THRESHOLD_PERCENT);
      reached.then(|| {
        PlanRecommendation {
          plan: next,
          reason: format!(
            "You have used {used} of {limit} {what} on the {} plan",
            self.info(plan).name
          ),
        }
      })
    })
  }

  pub fn promo(&self, code: &str) -> Option<&PromoCode> {
    self.promos.iter().find(|promo| promo.code.eq_ignore_ascii_case(code.trim()))
  }

  pub fn apply_promo(&self, amount_cents: i64, code: &str) -> Result<i64> {
    let promo = self
      .promo(code)
      .ok_or_else(|| Error::Validation(format!("unknown promo code `{code}`")))?;
    Ok(amount_cents - amount_cents * i64::from(promo.percent_off) / 100)
  }

  pub fn upgrade_offer(
    &self,
    current: Plan,
    days_remaining: Option<i64>,
  ) -> UpgradeOffer {
    let upgrade_options = self
      .plans
      .iter()
      .filter(|info| info.id.is_paid() && info.id as usize >= current as usize)
      .map(|info| UpgradeOption {
        plan: info.clone(),
        yearly_savings_cents: savings(info),
        recommended: info.popular,
      })
      .collect();

    let current = self.info(current);
    let trial_days = current.trial_days;

    let urgency = match days_remaining {
      Some(days) if days <= 2 => Urgency::High,
      Some(days) if days <= 7 => Urgency::Medium,
      _ => Urgency::Low,
    };

    UpgradeOffer {
      upgrade_options,
      promo_codes: self.promos.clone(),
      trial_value: TrialValue {
        days: trial_days,
        value_cents: current.monthly_price_cents * trial_days / 30,
      },
      urgency,
    }
  }
}

fn savings(info: &PlanInfo) -> i64 {
  (info.monthly_price_cents - info.yearly_price_cents) * 12
}
