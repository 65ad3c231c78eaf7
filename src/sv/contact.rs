use serde::Deserialize;
use uuid::Uuid;

use crate::{
  entity::contact_submission, notify::Notification, prelude::*,
  state::AppState,
};

const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  pub company: Option<String>,
  pub subject: Option<String>,
  #[serde(default)]
  pub message: String,
}

fn optional(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ContactForm {
  fn validate(self) -> Result<Self> {
    let name = self.name.trim().to_string();
    let email = self.email.trim().to_string();
    let message = self.message.trim().to_string();

    if name.is_empty() {
      return Err(Error::Validation("name is required".into()));
    }
    if email.is_empty() {
      return Err(Error::Validation("email is required".into()));
    }
    if !utils::is_valid_email(&email) {
      return Err(Error::Validation("email is invalid".into()));
    }
    if message.is_empty() {
      return Err(Error::Validation("message is required".into()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
      return Err(Error::Validation(format!(
        "message must be at most {MAX_MESSAGE_CHARS} characters"
      )));
    }

    Ok(Self {
      name,
      email,
      company: optional(self.company),
      subject: optional(self.subject),
      message,
    })
  }
}

pub struct Contact<'a> {
  app: &'a AppState,
}

impl<'a> Contact<'a> {
  pub fn new(app: &'a AppState) -> Self {
    Self { app }
  }

  pub async fn submit(
    &self,
    form: ContactForm,
  ) -> Result<contact_submission::Model> {
    let form = form.validate()?;

    let submission = contact_submission::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      name: Set(form.name),
      email: Set(form.email),
      company: Set(form.company),
      subject: Set(form.subject),
      message: Set(form.message),
      created_at: Set(self.app.clock.now()),
    }
    .insert(&self.app.db)
    .await?;

    info!("Contact submission {} from {}", submission.id, submission.email);

    let notification = Notification::ContactSubmitted {
      id: submission.id.clone(),
      name: submission.name.clone(),
      email: submission.email.clone(),
      subject: submission.subject.clone(),
      message: submission.message.clone(),
    };
    if let Err(err) = self.app.notifier.notify(&notification).await {
      warn!("Failed to forward contact submission: {err:#}");
    }

    Ok(submission)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing;

  fn form() -> ContactForm {
    ContactForm {
      name: " Ada Lovelace ".into(),
      email: "ada@example.com".into(),
      company: Some("  ".into()),
      subject: Some("Enterprise pricing".into()),
      message: "Do you offer volume discounts?".into(),
    }
  }

  #[tokio::test]
  async fn test_submit_stores_and_notifies() {
    let t = testing::app().await;

    let submission = t.app.sv().contact.submit(form()).await.unwrap();
    assert_eq!(submission.name, "Ada Lovelace");
    assert_eq!(submission.company, None);

    let stored = contact_submission::Entity::find_by_id(submission.id.clone())
      .one(&t.app.db)
      .await
      .unwrap();
    assert_eq!(stored, Some(submission));
    assert_eq!(t.notifier.sent().len(), 1);
  }

  #[tokio::test]
  async fn test_submit_validation() {
    let t = testing::app().await;
    let sv = t.app.sv().contact;

    let cases = [
      ContactForm { name: "".into(), ..form() },
      ContactForm { email: "".into(), ..form() },
      ContactForm { email: "not-an-email".into(), ..form() },
      ContactForm { message: "   ".into(), ..form() },
      ContactForm { message: "x".repeat(MAX_MESSAGE_CHARS + 1), ..form() },
    ];

    for case in cases {
      assert!(matches!(sv.submit(case).await, Err(Error::Validation(_))));
    }
    assert!(t.notifier.sent().is_empty());
  }
}
