use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use super::extract::{AuthUser, Params, Payload, Verified};
use crate::{
  entity::{BillingInterval, Plan, UsageCounter, UsageStats, trial_extension, user},
  prelude::*,
  state::AppState,
  sv::{
    checkout::CheckoutSession,
    contact::ContactForm,
    pricing::{PlanInfo, PlanRecommendation, UpgradeOffer},
    trial::{ConvertReq, Conversion, Eligibility, StatusReport, TrialView},
  },
};

pub async fn health() -> &'static str {
  "OK"
}

pub async fn register(
  State(app): State<Arc<AppState>>,
  Verified(identity): Verified,
) -> Result<Json<user::Model>> {
  let user = app.sv().user.register(&identity.uid, identity.email).await?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct StartReq {
  #[serde(default)]
  pub plan: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartRes {
  pub success: bool,
  pub trial: TrialView,
}

pub async fn start_trial(
  State(app): State<Arc<AppState>>,
  AuthUser(user): AuthUser,
  Payload(req): Payload<StartReq>,
) -> Result<(StatusCode, Json<StartRes>)> {
  let plan: Plan = req
    .plan
    .ok_or_else(|| Error::Validation("plan is required".into()))?
    .parse()?;

  let sv = app.sv().trial;
  let trial = sv.start(&user.uid, plan).await?;

  Ok((
    StatusCode::CREATED,
    Json(StartRes { success: true, trial: sv.view(trial)? }),
  ))
}

pub async fn trial_eligibility(
  State(app): State<Arc<AppState>>,
  AuthUser(user): AuthUser,
) -> Result<Json<Eligibility>> {
  Ok(Json(app.sv().trial.eligibility(&user.uid).await?))
}

pub async fn trial_status(
  State(app): State<Arc<AppState>>,
  AuthUser(user): AuthUser,
) -> Result<Json<StatusReport>> {
  Ok(Json(app.sv().trial.status(&user.uid).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialActionReq {
  #[serde(default)]
  pub action: String,
  pub additional_days: Option<i64>,
  pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrialActionRes {
  pub success: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub trial: Option<TrialView>,
}

pub async fn trial_action(
  State(app): State<Arc<AppState>>,
  AuthUser(user): AuthUser,
  Payload(req): Payload<TrialActionReq>,
) -> Result<Json<TrialActionRes>> {
  let sv = app.sv().trial;

  let (trial, message) = match req.action.as_str() {
    "cancel" => (sv.cancel(&user.uid).await?, "Trial cancelled".to_string()),
    "extend" => {
      let days = req.additional_days.ok_or_else(|| {
        Error::Validation("additionalDays is required".into())
      })?;
      let trial = sv.extend(&user.uid, days, req.reason).await?;
      (trial, format!("Trial extended by {days} days"))
    }
    other => {
      return Err(Error::Validation(format!(
        "unknown action `{other}`, expected `cancel` or `extend`"
      )));
    }
  };

  Ok(Json(TrialActionRes {
    success: true,
    message,
    trial: Some(sv.view(trial)?),
  }))
}

pub async fn trial_extensions(
  State(app): State<Arc<AppState>>,
  AuthUser(user): AuthUser,
) -> Result<Json<Vec<trial_extension::Model>>> {
  let sv = app.sv().trial;
  let trial = sv.latest(&user.uid).await?.ok_or(Error::TrialNotFound)?;
  Ok(Json(sv.extensions(&trial.id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReq {
  pub counter: UsageCounter,
  #[serde(default = "one")]
  pub amount: u64,
}

fn one() -> u64 {
  1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRes {
  pub usage_stats: UsageStats,
  pub plan_recommendation: Option<PlanRecommendation>,
}

pub async fn record_usage(
  State(app): State<Arc<AppState>>,
  AuthUser(user): AuthUser,
  Payload(req): Payload<UsageReq>,
) -> Result<Json<UsageRes>> {
  let trial =
    app.sv().trial.record_usage(&user.uid, req.counter, req.amount).await?;

  Ok(Json(UsageRes {
    plan_recommendation: app
      .catalog
      .upgrade_recommendation(trial.plan, &trial.usage_stats),
    usage_stats: trial.usage_stats,
  }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeReq {
  #[serde(default)]
  pub user_id: String,
  #[serde(default)]
  pub new_plan: String,
  pub interval: Option<String>,
  pub payment_method_id: Option<String>,
  pub promo_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpgradeRes {
  pub success: bool,
  #[serde(flatten)]
  pub conversion: Conversion,
}

pub async fn upgrade(
  State(app): State<Arc<AppState>>,
  Payload(req): Payload<UpgradeReq>,
) -> Result<Json<UpgradeRes>> {
  let user_id = req.user_id.trim();
  if user_id.is_empty() {
    return Err(Error::Validation("userId is required".into()));
  }

  let plan: Plan = req.new_plan.parse()?;
  let interval = req
    .interval
    .as_deref()
    .map(str::parse::<BillingInterval>)
    .transpose()?
    .unwrap_or_default();

  let conversion = app
    .sv()
    .trial
    .convert(ConvertReq {
      user_id: user_id.to_string(),
      plan,
      interval,
      payment_method: req.payment_method_id,
      promo_code: req.promo_code,
    })
    .await?;

  Ok(Json(UpgradeRes { success: true, conversion }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOfferQuery {
  pub current_plan: Option<String>,
  pub days_remaining: Option<i64>,
}

pub async fn upgrade_offer(
  State(app): State<Arc<AppState>>,
  Params(query): Params<UpgradeOfferQuery>,
) -> Result<Json<UpgradeOffer>> {
  let current = query
    .current_plan
    .as_deref()
    .map(str::parse::<Plan>)
    .transpose()?
    .unwrap_or(Plan::Professional);

  Ok(Json(app.catalog.upgrade_offer(current, query.days_remaining)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanListing {
  #[serde(flatten)]
  pub plan: PlanInfo,
  pub yearly_savings_cents: i64,
}

pub async fn list_plans(
  State(app): State<Arc<AppState>>,
) -> Json<Vec<PlanListing>> {
  let catalog = &app.catalog;
  let plans = catalog
    .plans()
    .iter()
    .map(|info| PlanListing {
      yearly_savings_cents: catalog
        .yearly_savings(info.id.as_str())
        .unwrap_or_default(),
      plan: info.clone(),
    })
    .collect();
  Json(plans)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReq {
  #[serde(default)]
  pub plan_id: String,
  pub interval: Option<String>,
  #[serde(default)]
  pub user_id: String,
  #[serde(default)]
  pub return_url: String,
}

pub async fn create_checkout(
  State(app): State<Arc<AppState>>,
  Payload(req): Payload<CheckoutReq>,
) -> Result<Json<CheckoutSession>> {
  let interval = req.interval.as_deref().unwrap_or("monthly");
  let session = app.sv().checkout.create_session(
    &req.plan_id,
    interval,
    &req.user_id,
    &req.return_url,
  )?;
  Ok(Json(session))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRes {
  pub success: bool,
  pub submission_id: String,
}

pub async fn submit_contact(
  State(app): State<Arc<AppState>>,
  Payload(form): Payload<ContactForm>,
) -> Result<Json<ContactRes>> {
  let submission = app.sv().contact.submit(form).await?;
  Ok(Json(ContactRes { success: true, submission_id: submission.id }))
}
