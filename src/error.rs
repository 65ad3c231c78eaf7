//! Error taxonomy of the trial service and its HTTP mapping

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use tracing::error;

use crate::entity::{TrialStatus, trial};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("{0}")]
  Unauthorized(String),

  #[error("Identity service unavailable")]
  IdentityUnavailable,

  #[error("User not found")]
  UserNotFound,

  #[error("Trial not found")]
  TrialNotFound,

  #[error("Plan `{0}` not found")]
  PlanNotFound(String),

  #[error("User already has an active trial")]
  TrialAlreadyActive(Option<Box<trial::Model>>),

  #[error("Trial already used (status: {0})")]
  TrialAlreadyUsed(TrialStatus),

  #[error("Cannot {action} a trial that is {from}")]
  InvalidTransition { from: TrialStatus, action: &'static str },

  #[error("{0}")]
  Validation(String),

  #[error("Invalid trial record: {0}")]
  InvalidRecord(String),

  #[error("Payment failed: {0}")]
  Payment(String),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Error::IdentityUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      Error::UserNotFound | Error::TrialNotFound | Error::PlanNotFound(_) => {
        StatusCode::NOT_FOUND
      }
      Error::TrialAlreadyActive(_)
      | Error::TrialAlreadyUsed(_)
      | Error::InvalidTransition { .. } => StatusCode::CONFLICT,
      Error::Validation(_) | Error::InvalidRecord(_) => StatusCode::BAD_REQUEST,
      Error::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      Error::Database(_) | Error::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();

    let message = match &self {
      Error::Database(_) | Error::Internal(_) => {
        error!("Request failed: {self}");
        "Internal server error".to_string()
      }
      other => other.to_string(),
    };

    let mut body = json::json!({
      "success": false,
      "error": message,
    });

    if let Error::TrialAlreadyActive(Some(existing)) = &self {
      body["details"] = json::json!({ "existingTrial": existing });
    }

    (status, Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_mapping() {
    assert_eq!(
      Error::Unauthorized("nope".into()).status(),
      StatusCode::UNAUTHORIZED
    );
    assert_eq!(
      Error::IdentityUnavailable.status(),
      StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(Error::TrialNotFound.status(), StatusCode::NOT_FOUND);
    assert_eq!(Error::TrialAlreadyActive(None).status(), StatusCode::CONFLICT);
    assert_eq!(
      Error::Validation("bad".into()).status(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      Error::Internal("boom".into()).status(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  async fn render(err: Error) -> (StatusCode, json::Value) {
    let res = err.into_response();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn test_internal_details_are_hidden() {
    for err in [
      Error::Internal("secret connection string".into()),
      Error::Database(sea_orm::DbErr::Custom("secret connection string".into())),
    ] {
      let (status, body) = render(err).await;
      assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
      assert_eq!(body["success"], false);
      assert_eq!(body["error"], "Internal server error");
      assert!(!body.to_string().contains("secret"));
    }
  }

  #[tokio::test]
  async fn test_client_errors_carry_message() {
    let (status, body) = render(Error::Validation("plan is required".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "plan is required");
    assert!(body.get("details").is_none());

    let (status, body) = render(Error::TrialAlreadyActive(None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User already has an active trial");
  }
}
