use reqwest::Url;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  entity::BillingInterval,
  prelude::*,
  sv::pricing::{Catalog, PlanInfo},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
  pub url: String,
  pub session_id: String,
  pub plan: PlanInfo,
}

pub struct Checkout<'a> {
  catalog: &'a Catalog,
}

impl<'a> Checkout<'a> {
  pub fn new(catalog: &'a Catalog) -> Self {
    Self { catalog }
  }

  pub fn create_session(
    &self,
    plan_id: &str,
    interval: &str,
    user_id: &str,
    return_url: &str,
  ) -> Result<CheckoutSession> {
    let required = |value: &str, field: &str| {
      if value.trim().is_empty() {
        Err(Error::Validation(format!("{field} is required")))
      } else {
        Ok(())
      }
    };
    required(plan_id, "planId")?;
    required(user_id, "userId")?;
    required(return_url, "returnUrl")?;

    let return_url = Url::parse(return_url)
      .map_err(|_| Error::Validation("returnUrl must be an absolute url".into()))?;
    let interval: BillingInterval = interval.parse()?;

    let plan = self
      .catalog
      .plan(plan_id)
      .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;

    let session_id = format!("cs_{}", Uuid::new_v4().simple());
    let mut url = self.catalog.checkout_url(plan.id, interval, user_id.trim())?;
    url
      .query_pairs_mut()
      .append_pair("session_id", &session_id)
      .append_pair("return_url", return_url.as_str());

    debug!("Checkout session {} for {} on {}", session_id, user_id, plan.id);

    Ok(CheckoutSession { url: url.into(), session_id, plan: plan.clone() })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::Plan;

  fn catalog() -> Catalog {
    Catalog::standard(Url::parse("https://app.example.com").unwrap(), 90)
  }

  #[test]
  fn test_session_for_paid_plan() {
    let catalog = catalog();
    let session = Checkout::new(&catalog)
      .create_session(
        "professional",
        "yearly",
        "alice",
        "https://app.example.com/billing",
      )
      .unwrap();

    assert!(session.session_id.starts_with("cs_"));
    assert_eq!(session.plan.id, Plan::Professional);

    let url = Url::parse(&session.url).unwrap();
    assert_eq!(url.path(), "/checkout");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("session_id".into(), session.session_id.clone())));
    assert!(pairs.contains(&(
      "return_url".into(),
      "https://app.example.com/billing".into()
    )));
  }

  #[test]
  fn test_session_errors() {
    let catalog = catalog();
    let checkout = Checkout::new(&catalog);
    let back = "https://app.example.com/billing";

    assert!(matches!(
      checkout.create_session("gold", "monthly", "alice", back),
      Err(Error::PlanNotFound(_))
    ));
    assert!(matches!(
      checkout.create_session("professional", "weekly", "alice", back),
      Err(Error::Validation(_))
    ));
    assert!(matches!(
      checkout.create_session("professional", "monthly", " ", back),
      Err(Error::Validation(_))
    ));
    assert!(matches!(
      checkout.create_session("professional", "monthly", "alice", "/billing"),
      Err(Error::Validation(_))
    ));
  }
}
