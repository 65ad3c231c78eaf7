//! In-process doubles for the external collaborators.

use std::sync::Mutex;

use chrono::NaiveDate;

use crate::{
  clock::Clock,
  config::Config,
  entity::user,
  identity::{Identity, IdentityVerifier},
  notify::{Notification, NotificationSink},
  payment::{ChargeRequest, PaymentGateway, PaymentReceipt},
  prelude::*,
  state::{self, AppState, Collaborators},
};

/// Payment method the recording gateway declines.
pub const DECLINED_CARD: &str = "pm_card_declined";

pub struct ManualClock(Mutex<DateTime>);

impl ManualClock {
  pub fn advance(&self, by: TimeDelta) {
    *self.0.lock().unwrap() += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime {
    *self.0.lock().unwrap()
  }
}

/// Accepts `token-<uid>` bearer tokens.
pub struct StaticIdentity;

#[async_trait]
impl IdentityVerifier for StaticIdentity {
  async fn verify_id_token(&self, token: &str) -> Result<Identity> {
    match token.strip_prefix("token-") {
      Some(uid) if !uid.is_empty() => Ok(Identity {
        uid: uid.to_string(),
        email: Some(format!("{uid}@example.com")),
      }),
      _ => Err(Error::Unauthorized("Invalid or expired token".into())),
    }
  }
}

#[derive(Default)]
pub struct RecordingGateway(Mutex<Vec<ChargeRequest>>);

impl RecordingGateway {
  pub fn charges(&self) -> Vec<ChargeRequest> {
    self.0.lock().unwrap().clone()
  }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
  async fn charge(&self, req: &ChargeRequest) -> Result<PaymentReceipt> {
    if req.payment_method.as_deref() == Some(DECLINED_CARD) {
      return Err(Error::Payment("card declined".into()));
    }

    let mut charges = self.0.lock().unwrap();
    charges.push(req.clone());

    Ok(PaymentReceipt {
      transaction_id: format!("txn_test_{}", charges.len()),
      amount_cents: req.amount_cents,
      currency: req.currency.clone(),
      status: "succeeded",
    })
  }
}

#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<Notification>>);

impl RecordingSink {
  pub fn sent(&self) -> Vec<Notification> {
    self.0.lock().unwrap().clone()
  }
}

#[async_trait]
impl NotificationSink for RecordingSink {
  async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
    self.0.lock().unwrap().push(notification.clone());
    Ok(())
  }
}

pub struct TestApp {
  pub app: Arc<AppState>,
  pub clock: Arc<ManualClock>,
  pub payments: Arc<RecordingGateway>,
  pub notifier: Arc<RecordingSink>,
}

impl TestApp {
  pub async fn user(&self, uid: &str) -> user::Model {
    self.app.sv().user.register(uid, None).await.unwrap()
  }
}

pub async fn app() -> TestApp {
  let db = state::connect_db("sqlite::memory:").await.unwrap();

  let start = NaiveDate::from_ymd_opt(2026, 3, 1)
    .unwrap()
    .and_hms_opt(9, 0, 0)
    .unwrap();
  let clock = Arc::new(ManualClock(Mutex::new(start)));
  let payments = Arc::new(RecordingGateway::default());
  let notifier = Arc::new(RecordingSink::default());

  let app = AppState::from_parts(
    db,
    Config::default(),
    Collaborators {
      clock: clock.clone(),
      identity: Arc::new(StaticIdentity),
      payments: payments.clone(),
      notifier: notifier.clone(),
    },
  );

  TestApp { app: Arc::new(app), clock, payments, notifier }
}
