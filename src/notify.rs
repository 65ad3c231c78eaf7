//! Outbound notifications (admin alerts, welcome messages)

use std::collections::HashSet;

use teloxide::{
  Bot,
  prelude::*,
  types::{ChatId, ParseMode},
  utils::html,
};

use crate::{entity::Plan, prelude::*};

/// Longest contact message forwarded verbatim.
const MESSAGE_PREVIEW: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
  TrialStarted { user_id: String, plan: Plan, ends_at: DateTime },
  TrialConverted { user_id: String, plan: Plan, amount_cents: i64 },
  ContactSubmitted {
    id: String,
    name: String,
    email: String,
    subject: Option<String>,
    message: String,
  },
}

impl Notification {
  /// Telegram-flavoured HTML.
  pub fn render(&self) -> String {
    match self {
      Notification::TrialStarted { user_id, plan, ends_at } => format!(
        "🚀 <b>Trial started</b>\nUser: <code>{}</code>\nPlan: {}\nEnds: {}",
        html::escape(user_id),
        plan,
        utils::format_date(*ends_at)
      ),
      Notification::TrialConverted { user_id, plan, amount_cents } => format!(
        "💰 <b>Trial converted</b>\nUser: <code>{}</code>\nPlan: {}\nCharged: {}",
        html::escape(user_id),
        plan,
        utils::format_cents(*amount_cents)
      ),
      Notification::ContactSubmitted { id, name, email, subject, message } => {
        let mut preview: String =
          message.chars().take(MESSAGE_PREVIEW).collect();
        if preview.len() < message.len() {
          preview.push('…');
        }
        format!(
          "✉️ <b>Contact form</b> <code>{}</code>\nFrom: {} &lt;{}&gt;\nSubject: {}\n\n{}",
          id,
          html::escape(name),
          html::escape(email),
          html::escape(subject.as_deref().unwrap_or("-")),
          html::escape(&preview)
        )
      }
    }
  }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
  async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the log only.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
  async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
    info!("Notification: {:?}", notification);
    Ok(())
  }
}

/// Forwards notifications to every configured Telegram admin.
pub struct TelegramSink {
  bot: Bot,
  admins: HashSet<i64>,
}

impl TelegramSink {
  pub fn new(token: &str, admins: HashSet<i64>) -> Self {
    Self { bot: Bot::new(token), admins }
  }
}

#[async_trait]
impl NotificationSink for TelegramSink {
  async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
    let text = notification.render();

    for &admin in self.admins.iter() {
      self
        .bot
        .send_message(ChatId(admin), text.clone())
        .parse_mode(ParseMode::Html)
        .await
        .with_context(|| format!("Failed to notify admin {admin}"))?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_render_escapes_user_input() {
    let text = Notification::ContactSubmitted {
      id: "c1".into(),
      name: "<script>".into(),
      email: "a@b.co".into(),
      subject: None,
      message: "hi & bye".into(),
    }
    .render();

    assert!(text.contains("&lt;script&gt;"));
    assert!(text.contains("hi &amp; bye"));
    assert!(text.contains("Subject: -"));
  }

  #[test]
  fn test_render_truncates_long_messages() {
    let text = Notification::ContactSubmitted {
      id: "c1".into(),
      name: "Ada".into(),
      email: "a@b.co".into(),
      subject: Some("Pricing".into()),
      message: "x".repeat(MESSAGE_PREVIEW * 2),
    }
    .render();

    assert!(text.ends_with('…'));
    assert!(text.len() < MESSAGE_PREVIEW * 2);
  }

  #[test]
  fn test_render_conversion() {
    let text = Notification::TrialConverted {
      user_id: "alice".into(),
      plan: Plan::Professional,
      amount_cents: 2900,
    }
    .render();

    assert!(text.contains("professional"));
    assert!(text.contains("$29.00"));
  }
}
