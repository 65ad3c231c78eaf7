use std::{collections::HashSet, env};

use reqwest::Url;

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  /// Base for checkout and redirect links.
  pub app_url: Url,
  pub trial_days: i64,
  pub grace_period: TimeDelta,
  pub identity_url: Option<Url>,
  pub identity_cache_ttl: Duration,
  pub payment_delay: Duration,
  pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
  pub token: String,
  pub admins: HashSet<i64>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:invoicer.db?mode=rwc"),
      port: 3000,
      app_url: Url::parse("http://localhost:3000")
        .expect("static url is valid"),
      trial_days: 90,
      grace_period: TimeDelta::days(3),
      identity_url: None,
      identity_cache_ttl: Duration::from_secs(5 * 60),
      payment_delay: Duration::from_millis(1500),
      telegram: None,
    }
  }
}

/// Longest accepted `TRIAL_DAYS`.
pub const MAX_TRIAL_DAYS: i64 = 3650;

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    Self::from_vars(|key| env::var(key).ok())
  }

  fn from_vars(
    lookup: impl Fn(&str) -> Option<String>,
  ) -> anyhow::Result<Self> {
    let defaults = Self::default();

    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let duration = |key: &str, default: Duration| match var(key) {
      Some(raw) => humantime::parse_duration(raw.trim())
        .with_context(|| format!("{key} is not a valid duration: `{raw}`")),
      None => Ok(default),
    };

    let port = match var("PORT") {
      Some(port) => port.trim().parse().context("PORT must be a port number")?,
      None => defaults.port,
    };

    let app_url = match var("APP_URL") {
      Some(url) => Url::parse(&url).context("APP_URL is not a valid url")?,
      None => defaults.app_url,
    };

    let trial_days = match var("TRIAL_DAYS") {
      Some(days) => {
        days.trim().parse().context("TRIAL_DAYS must be an integer")?
      }
      None => defaults.trial_days,
    };
    anyhow::ensure!(
      (1..=MAX_TRIAL_DAYS).contains(&trial_days),
      "TRIAL_DAYS must be between 1 and {MAX_TRIAL_DAYS}"
    );

    let grace_period = duration("GRACE_PERIOD", Duration::from_secs(3 * 86400))?;
    let grace_period = TimeDelta::from_std(grace_period)
      .context("GRACE_PERIOD is out of range")?;

    let identity_url = var("IDENTITY_URL")
      .map(|url| Url::parse(&url).context("IDENTITY_URL is not a valid url"))
      .transpose()?;

    let telegram = match var("TELOXIDE_TOKEN") {
      Some(token) => {
        let admins = var("ADMIN_IDS")
          .unwrap_or_default()
          .split(',')
          .filter(|s| !s.trim().is_empty())
          .map(|id| id.trim().parse::<i64>())
          .collect::<std::result::Result<HashSet<_>, _>>()
          .context("Invalid Admin ID format")?;
        Some(TelegramConfig { token, admins })
      }
      None => None,
    };

    Ok(Self {
      database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
      port,
      app_url,
      trial_days,
      grace_period,
      identity_url,
      identity_cache_ttl: duration(
        "IDENTITY_CACHE_TTL",
        defaults.identity_cache_ttl,
      )?,
      payment_delay: duration("PAYMENT_DELAY", defaults.payment_delay)?,
      telegram,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
    let vars: HashMap<String, String> = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    Config::from_vars(|key| vars.get(key).cloned())
  }

  #[test]
  fn test_defaults() {
    let config = load(&[]).unwrap();
    assert_eq!(config.trial_days, 90);
    assert_eq!(config.port, 3000);
    assert_eq!(config.grace_period, TimeDelta::days(3));
    assert_eq!(config.payment_delay, Duration::from_millis(1500));
    assert!(config.identity_url.is_none());
    assert!(config.telegram.is_none());
    assert_eq!(config.app_url.as_str(), "http://localhost:3000/");
  }

  #[test]
  fn test_overrides() {
    let config = load(&[
      ("PORT", "8080"),
      ("TRIAL_DAYS", "14"),
      ("GRACE_PERIOD", "12h"),
      ("IDENTITY_CACHE_TTL", "30s"),
      ("PAYMENT_DELAY", "0ms"),
      ("IDENTITY_URL", "https://id.example.com/verify"),
      ("TELOXIDE_TOKEN", "123:abc"),
      ("ADMIN_IDS", "1, 2,,3"),
      ("DATABASE_URL", "  "),
    ])
    .unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.trial_days, 14);
    assert_eq!(config.grace_period, TimeDelta::hours(12));
    assert_eq!(config.identity_cache_ttl, Duration::from_secs(30));
    assert_eq!(config.payment_delay, Duration::ZERO);
    assert_eq!(
      config.identity_url.unwrap().as_str(),
      "https://id.example.com/verify"
    );
    assert_eq!(config.telegram.unwrap().admins, HashSet::from([1, 2, 3]));
    assert_eq!(config.database_url, Config::default().database_url);
  }

  #[test]
  fn test_rejects_bad_values() {
    for vars in [
      [("TRIAL_DAYS", "0")],
      [("TRIAL_DAYS", "-5")],
      [("TRIAL_DAYS", "3651")],
      [("TRIAL_DAYS", "9223372036854775807")],
      [("GRACE_PERIOD", "three days")],
      [("PORT", "70000")],
      [("APP_URL", "not a url")],
    ] {
      assert!(load(&vars).is_err(), "{vars:?} should be rejected");
    }

    assert!(load(&[("TELOXIDE_TOKEN", "t"), ("ADMIN_IDS", "1,x")]).is_err());
    assert_eq!(
      load(&[("TRIAL_DAYS", "3650")]).unwrap().trial_days,
      MAX_TRIAL_DAYS
    );
  }
}
