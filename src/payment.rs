//! Payment processor capability.
//!
//! No real processor is wired in yet: [`SandboxGateway`] stands in for one
//! and is announced as such at startup.

use serde::Serialize;
use uuid::Uuid;

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
  pub user_id: String,
  pub amount_cents: i64,
  pub currency: String,
  pub description: String,
  pub payment_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
  pub transaction_id: String,
  pub amount_cents: i64,
  pub currency: String,
  pub status: &'static str,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn charge(&self, req: &ChargeRequest) -> Result<PaymentReceipt>;
}

/// Simulated processor: waits `delay`, then approves every charge except
/// payment methods starting with `pm_fail`, mirroring processor test cards.
pub struct SandboxGateway {
  delay: Duration,
}

impl SandboxGateway {
  pub fn new(delay: Duration) -> Self {
    Self { delay }
  }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
  async fn charge(&self, req: &ChargeRequest) -> Result<PaymentReceipt> {
    if req.amount_cents < 0 {
      return Err(Error::Payment("negative amount".into()));
    }

    tokio::time::sleep(self.delay).await;

    if req
      .payment_method
      .as_deref()
      .is_some_and(|pm| pm.starts_with("pm_fail"))
    {
      return Err(Error::Payment("card declined".into()));
    }

    let transaction_id = format!("txn_{}", Uuid::new_v4().simple());
    debug!(
      "Sandbox charge {} for {}: {} ({})",
      transaction_id,
      req.user_id,
      req.description,
      utils::format_cents(req.amount_cents)
    );

    Ok(PaymentReceipt {
      transaction_id,
      amount_cents: req.amount_cents,
      currency: req.currency.clone(),
      status: "succeeded",
    })
  }
}
