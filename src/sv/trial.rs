use chrono::Months;
use sea_orm::{NotSet, SqlErr, sea_query::Expr};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  entity::{
    BillingInterval, Plan, TrialStatus, UsageCounter, UsageStats, subscription,
    trial, trial_extension, user,
  },
  notify::Notification,
  payment::{ChargeRequest, PaymentReceipt},
  prelude::*,
  state::AppState,
  sv::metrics::{self, TrialMetrics},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  StartTrial,
  Expire,
  UpgradeNow,
  None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
  pub action: Action,
  pub message: String,
  pub urgent: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
  pub trial: Option<trial::Model>,
  pub trial_metrics: Option<TrialMetrics>,
  pub upgrade_recommendation: Recommendation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
  pub eligible: bool,
  pub status: Option<TrialStatus>,
  pub message: String,
  pub existing_trial: Option<trial::Model>,
}

/// A trial record together with its metrics, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct TrialView {
  #[serde(flatten)]
  pub trial: trial::Model,
  #[serde(flatten)]
  pub metrics: TrialMetrics,
}

#[derive(Debug, Clone)]
pub struct ConvertReq {
  pub user_id: String,
  pub plan: Plan,
  pub interval: BillingInterval,
  pub payment_method: Option<String>,
  pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
  pub title: String,
  pub message: String,
  pub next_steps: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
  pub subscription: subscription::Model,
  pub payment: PaymentReceipt,
  pub welcome: Welcome,
}

/// Decision table behind the status endpoint's recommendation.
pub fn recommend(current: Option<(&trial::Model, &TrialMetrics)>) -> Recommendation {
  let (action, message, urgent) = match current {
    None => (
      Action::StartTrial,
      "Start your free trial to unlock every feature".to_string(),
      false,
    ),
    Some((trial, m)) if trial.status == TrialStatus::Active && m.is_expired => (
      Action::Expire,
      "Your trial has ended. Upgrade to keep your invoices and customers"
        .to_string(),
      true,
    ),
    Some((trial, m))
      if trial.status == TrialStatus::Active && m.is_expiring_soon =>
    {
      (
        Action::UpgradeNow,
        format!("Only {} days left in your trial", m.days_remaining),
        m.is_expiring_soon_critical,
      )
    }
    Some(_) => (Action::None, "No action needed".to_string(), false),
  };

  Recommendation { action, message, urgent }
}

async fn latest<C: ConnectionTrait>(
  db: &C,
  user_id: &str,
) -> Result<Option<trial::Model>> {
  let trial = trial::Entity::find()
    .filter(trial::Column::UserId.eq(user_id))
    .order_by_desc(trial::Column::CreatedAt)
    .one(db)
    .await?;
  Ok(trial)
}

/// Flips `active` trials whose end date has passed to `expired`.
async fn expire_stale<C: ConnectionTrait>(
  db: &C,
  user_id: Option<&str>,
  now: DateTime,
) -> Result<u64> {
  let mut update = trial::Entity::update_many()
    .col_expr(trial::Column::Status, Expr::value(TrialStatus::Expired))
    .col_expr(trial::Column::UpdatedAt, Expr::value(now))
    .filter(trial::Column::Status.eq(TrialStatus::Active))
    .filter(trial::Column::EndDate.lt(now));

  if let Some(user_id) = user_id {
    update = update.filter(trial::Column::UserId.eq(user_id));
  }

  Ok(update.exec(db).await?.rows_affected)
}

pub struct Trial<'a> {
  app: &'a AppState,
}

impl<'a> Trial<'a> {
  pub fn new(app: &'a AppState) -> Self {
    Self { app }
  }

  fn now(&self) -> DateTime {
    self.app.clock.now()
  }

  pub fn metrics(&self, trial: &trial::Model) -> Result<TrialMetrics> {
    metrics::for_trial(trial, self.now(), self.app.config.grace_period)
  }

  pub fn view(&self, trial: trial::Model) -> Result<TrialView> {
    let metrics = self.metrics(&trial)?;
    Ok(TrialView { trial, metrics })
  }

  pub async fn latest(&self, user_id: &str) -> Result<Option<trial::Model>> {
    latest(&self.app.db, user_id).await
  }

  async fn notify(&self, notification: Notification) {
    if let Err(err) = self.app.notifier.notify(&notification).await {
      warn!("Failed to deliver notification: {err:#}");
    }
  }

  pub async fn start(&self, user_id: &str, plan: Plan) -> Result<trial::Model> {
    if !plan.is_paid() {
      return Err(Error::Validation("The free plan has no trial".into()));
    }

    let now = self.now();
    let end_date = TimeDelta::try_days(self.app.config.trial_days)
      .and_then(|length| now.checked_add_signed(length))
      .ok_or_else(|| Error::Internal("trial length out of range".into()))?;

    let txn = self.app.db.begin().await?;

    if user::Entity::find_by_id(user_id).one(&txn).await?.is_none() {
      return Err(Error::UserNotFound);
    }

    expire_stale(&txn, Some(user_id), now).await?;

    // One trial per user: a past trial in any state blocks a new one.
    if let Some(existing) = latest(&txn, user_id).await? {
      return Err(match existing.status {
        TrialStatus::Active => {
          Error::TrialAlreadyActive(Some(Box::new(existing)))
        }
        status => Error::TrialAlreadyUsed(status),
      });
    }

    let trial = trial::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      user_id: Set(user_id.to_string()),
      plan: Set(plan),
      status: Set(TrialStatus::Active),
      start_date: Set(now),
      end_date: Set(end_date),
      features: Set(self.app.catalog.features_for(plan)),
      usage_stats: Set(UsageStats::default()),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
      Some(SqlErr::UniqueConstraintViolation(_)) => {
        Error::TrialAlreadyActive(None)
      }
      _ => Error::Database(err),
    })?;

    txn.commit().await?;

    info!("Trial {} started for {} on {}", trial.id, user_id, plan);
    self
      .notify(Notification::TrialStarted {
        user_id: user_id.to_string(),
        plan,
        ends_at: trial.end_date,
      })
      .await;

    Ok(trial)
  }

  pub async fn eligibility(&self, user_id: &str) -> Result<Eligibility> {
    let Some(trial) = self.latest(user_id).await? else {
      return Ok(Eligibility {
        eligible: true,
        status: None,
        message: format!(
          "You are eligible for a free {}-day trial",
          self.app.config.trial_days
        ),
        existing_trial: None,
      });
    };

    let metrics = self.metrics(&trial)?;
    let (status, message) = match trial.status {
      TrialStatus::Active if metrics.is_expired => {
        (TrialStatus::Expired, "Your trial has ended".to_string())
      }
      TrialStatus::Active => (
        TrialStatus::Active,
        format!(
          "You already have an active trial with {} days remaining",
          metrics.days_remaining
        ),
      ),
      TrialStatus::Converted => {
        (TrialStatus::Converted, "You already have a subscription".to_string())
      }
      status => (status, "Your free trial has already been used".to_string()),
    };

    Ok(Eligibility {
      eligible: false,
      status: Some(status),
      message,
      existing_trial: Some(trial),
    })
  }

  pub async fn status(&self, user_id: &str) -> Result<StatusReport> {
    self.cleanup_expired().await?;

    let Some(trial) = self.latest(user_id).await? else {
      return Ok(StatusReport {
        trial: None,
        trial_metrics: None,
        upgrade_recommendation: recommend(None),
      });
    };

    let metrics = self.metrics(&trial)?;
    Ok(StatusReport {
      upgrade_recommendation: recommend(Some((&trial, &metrics))),
      trial_metrics: Some(metrics),
      trial: Some(trial),
    })
  }

  pub async fn cleanup_expired(&self) -> Result<u64> {
    let expired = expire_stale(&self.app.db, None, self.now()).await?;
    if expired > 0 {
      info!("Expired {expired} trial(s)");
    }
    Ok(expired)
  }

  pub async fn extend(
    &self,
    user_id: &str,
    days: i64,
    reason: Option<String>,
  ) -> Result<trial::Model> {
    if days <= 0 {
      return Err(Error::Validation(
        "additionalDays must be a positive integer".into(),
      ));
    }
    let too_large =
      || Error::Validation("additionalDays is too large".into());
    let delta = TimeDelta::try_days(days).ok_or_else(too_large)?;

    let now = self.now();
    let txn = self.app.db.begin().await?;

    let trial = latest(&txn, user_id).await?.ok_or(Error::TrialNotFound)?;
    let end_date =
      trial.end_date.checked_add_signed(delta).ok_or_else(too_large)?;
    let trial_id = trial.id.clone();

    let trial = trial::ActiveModel {
      end_date: Set(end_date),
      updated_at: Set(now),
      ..trial.into()
    }
    .update(&txn)
    .await?;

    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    trial_extension::ActiveModel {
      id: NotSet,
      trial_id: Set(trial_id),
      days: Set(days),
      reason: Set(reason),
      created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!("Trial {} extended by {} day(s) for {}", trial.id, days, user_id);
    Ok(trial)
  }

  pub async fn extensions(
    &self,
    trial_id: &str,
  ) -> Result<Vec<trial_extension::Model>> {
    let rows = trial_extension::Entity::find()
      .filter(trial_extension::Column::TrialId.eq(trial_id))
      .order_by_asc(trial_extension::Column::CreatedAt)
      .all(&self.app.db)
      .await?;
    Ok(rows)
  }

  pub async fn cancel(&self, user_id: &str) -> Result<trial::Model> {
    let now = self.now();
    expire_stale(&self.app.db, Some(user_id), now).await?;

    let trial = self.latest(user_id).await?.ok_or(Error::TrialNotFound)?;

    match trial.status {
      TrialStatus::Cancelled => return Ok(trial),
      TrialStatus::Active => {}
      from => return Err(Error::InvalidTransition { from, action: "cancel" }),
    }

    let trial = trial::ActiveModel {
      status: Set(TrialStatus::Cancelled),
      updated_at: Set(now),
      ..trial.into()
    }
    .update(&self.app.db)
    .await?;

    info!("Trial {} cancelled by {}", trial.id, user_id);
    Ok(trial)
  }

  /// Converts the active trial into a paid subscription.
  ///
  /// The trial row is claimed in the same transaction as the subscription
  /// insert and before the charge; a declined payment rolls the claim back.
  pub async fn convert(&self, req: ConvertReq) -> Result<Conversion> {
    if !req.plan.is_paid() {
      return Err(Error::Validation("Cannot upgrade to the free plan".into()));
    }

    let catalog = &self.app.catalog;
    let info = catalog.info(req.plan);

    let promo_code = req
      .promo_code
      .as_deref()
      .map(str::trim)
      .filter(|code| !code.is_empty());
    let mut amount_cents = catalog.price(req.plan, req.interval);
    if let Some(code) = promo_code {
      amount_cents = catalog.apply_promo(amount_cents, code)?;
    }
    let promo_code =
      promo_code.and_then(|code| catalog.promo(code)).map(|p| p.code.to_string());

    let now = self.now();
    let period = match req.interval {
      BillingInterval::Monthly => Months::new(1),
      BillingInterval::Yearly => Months::new(12),
    };
    let current_period_end = now
      .checked_add_months(period)
      .ok_or_else(|| Error::Internal("billing period overflow".into()))?;

    let txn = self.app.db.begin().await?;
    expire_stale(&txn, Some(req.user_id.as_str()), now).await?;

    let trial = latest(&txn, &req.user_id).await?.ok_or(Error::TrialNotFound)?;
    if trial.status != TrialStatus::Active {
      return Err(Error::InvalidTransition {
        from: trial.status,
        action: "convert",
      });
    }

    let claimed = trial::Entity::update_many()
      .col_expr(trial::Column::Status, Expr::value(TrialStatus::Converted))
      .col_expr(trial::Column::UpdatedAt, Expr::value(now))
      .filter(trial::Column::Id.eq(trial.id.as_str()))
      .filter(trial::Column::Status.eq(TrialStatus::Active))
      .exec(&txn)
      .await?
      .rows_affected;
    if claimed != 1 {
      return Err(Error::InvalidTransition {
        from: TrialStatus::Converted,
        action: "convert",
      });
    }

    let payment = self
      .app
      .payments
      .charge(&ChargeRequest {
        user_id: req.user_id.clone(),
        amount_cents,
        currency: "usd".into(),
        description: format!("{} ({})", info.name, req.interval),
        payment_method: req.payment_method.clone(),
      })
      .await?;

    let subscription = subscription::ActiveModel {
      id: Set(format!("sub_{}", Uuid::new_v4().simple())),
      user_id: Set(req.user_id.clone()),
      trial_id: Set(Some(trial.id.clone())),
      plan: Set(req.plan),
      interval: Set(req.interval),
      amount_cents: Set(payment.amount_cents),
      currency: Set(payment.currency.clone()),
      transaction_id: Set(payment.transaction_id.clone()),
      promo_code: Set(promo_code),
      current_period_end: Set(current_period_end),
      created_at: Set(now),
    }
    .insert(&txn)
    .await;

    let subscription = match subscription {
      Ok(subscription) => subscription,
      Err(err) => {
        // the charge went through but nothing records it
        error!(
          "Charged {} (txn {}) but failed to store the subscription: {err}",
          req.user_id, payment.transaction_id
        );
        return Err(err.into());
      }
    };

    txn.commit().await?;

    info!(
      "Trial for {} converted to {} ({}), txn {}",
      req.user_id, req.plan, req.interval, payment.transaction_id
    );
    self
      .notify(Notification::TrialConverted {
        user_id: req.user_id.clone(),
        plan: req.plan,
        amount_cents,
      })
      .await;

    let welcome = Welcome {
      title: format!("Welcome to {}!", info.name),
      message: format!(
        "Your {} subscription is active until {}",
        info.name,
        utils::format_date(current_period_end)
      ),
      next_steps: vec![
        "Customize your invoice branding",
        "Import your customers",
        "Set up payment reminders",
      ],
    };

    Ok(Conversion { subscription, payment, welcome })
  }

  pub async fn record_usage(
    &self,
    user_id: &str,
    counter: UsageCounter,
    amount: u64,
  ) -> Result<trial::Model> {
    let trial = self
      .latest(user_id)
      .await?
      .filter(|trial| trial.status == TrialStatus::Active)
      .ok_or(Error::TrialNotFound)?;

    let mut usage = trial.usage_stats.clone();
    usage.bump(counter, amount);

    let trial = trial::ActiveModel {
      usage_stats: Set(usage),
      updated_at: Set(self.now()),
      ..trial.into()
    }
    .update(&self.app.db)
    .await?;

    Ok(trial)
  }
}
