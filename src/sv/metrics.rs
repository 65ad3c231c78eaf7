//! Derived, non-persisted trial figures.

use serde::Serialize;

use crate::{entity::trial, prelude::*};

const DAY_MS: f64 = 86_400_000.0;
const HOUR_MS: i64 = 3_600_000;

const EXPIRING_SOON_DAYS: i64 = 7;
const EXPIRING_CRITICAL_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialMetrics {
  pub total_days: i64,
  pub days_elapsed: i64,
  pub days_remaining: i64,
  pub hours_remaining: i64,
  pub progress_percentage: f64,
  pub is_expired: bool,
  pub is_expiring_soon: bool,
  pub is_expiring_soon_critical: bool,
  pub is_in_grace_period: bool,
}

pub fn calculate(
  start: DateTime,
  end: DateTime,
  now: DateTime,
  grace: TimeDelta,
) -> Result<TrialMetrics> {
  if end <= start {
    return Err(Error::InvalidRecord(format!(
      "end date {end} is not after start date {start}"
    )));
  }

  let span = (end - start).num_milliseconds() as f64;
  let elapsed = (now - start).num_milliseconds() as f64;
  let left = (end - now).num_milliseconds();

  let total_days = (span / DAY_MS).ceil() as i64;
  let days_elapsed = ((elapsed / DAY_MS).floor() as i64).clamp(0, total_days);
  let days_remaining = ((left as f64 / DAY_MS).ceil() as i64).max(0);
  let hours_remaining = (left / HOUR_MS).max(0);

  let progress_percentage = if now >= end {
    100.0
  } else {
    (days_elapsed as f64 / total_days as f64 * 100.0).clamp(0.0, 100.0)
  };

  let is_expired = now > end;

  Ok(TrialMetrics {
    total_days,
    days_elapsed,
    days_remaining,
    hours_remaining,
    progress_percentage,
    is_expired,
    is_expiring_soon: !is_expired && days_remaining <= EXPIRING_SOON_DAYS,
    is_expiring_soon_critical: !is_expired
      && days_remaining <= EXPIRING_CRITICAL_DAYS,
    is_in_grace_period: is_expired && now - end <= grace,
  })
}

pub fn for_trial(
  trial: &trial::Model,
  now: DateTime,
  grace: TimeDelta,
) -> Result<TrialMetrics> {
  calculate(trial.start_date, trial.end_date, now, grace)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn at(day: u32, hour: u32) -> DateTime {
    NaiveDate::from_ymd_opt(2026, 1, day)
      .unwrap()
      .and_hms_opt(hour, 0, 0)
      .unwrap()
  }

  fn grace() -> TimeDelta {
    TimeDelta::days(3)
  }

  #[test]
  fn test_fresh_trial() {
    let start = at(1, 0);
    let end = start + TimeDelta::days(90);
    let m = calculate(start, end, start, grace()).unwrap();

    assert_eq!(m.total_days, 90);
    assert_eq!(m.days_elapsed, 0);
    assert_eq!(m.days_remaining, 90);
    assert_eq!(m.hours_remaining, 90 * 24);
    assert_eq!(m.progress_percentage, 0.0);
    assert!(!m.is_expired);
    assert!(!m.is_expiring_soon);
  }

  #[test]
  fn test_partial_days_round_outward() {
    let start = at(1, 0);
    let end = at(11, 12);
    let m = calculate(start, end, at(2, 6), grace()).unwrap();

    assert_eq!(m.total_days, 11);
    assert_eq!(m.days_elapsed, 1);
    assert_eq!(m.days_remaining, 10);
    assert_eq!(m.hours_remaining, 9 * 24 + 6);
  }

  #[test]
  fn test_expiring_soon_windows() {
    let start = at(1, 0);
    let end = at(21, 0);

    let m = calculate(start, end, at(14, 0), grace()).unwrap();
    assert_eq!(m.days_remaining, 7);
    assert!(m.is_expiring_soon);
    assert!(!m.is_expiring_soon_critical);

    let m = calculate(start, end, at(19, 0), grace()).unwrap();
    assert_eq!(m.days_remaining, 2);
    assert!(m.is_expiring_soon_critical);

    let m = calculate(start, end, at(13, 0), grace()).unwrap();
    assert!(!m.is_expiring_soon);
  }

  #[test]
  fn test_expiry_and_grace() {
    let start = at(1, 0);
    let end = at(10, 12);

    let m = calculate(start, end, end, grace()).unwrap();
    assert!(!m.is_expired);
    assert_eq!(m.progress_percentage, 100.0);
    assert!(!m.is_expiring_soon || m.days_remaining == 0);

    let m = calculate(start, end, at(12, 0), grace()).unwrap();
    assert!(m.is_expired);
    assert!(m.is_in_grace_period);
    assert!(!m.is_expiring_soon);
    assert_eq!(m.days_remaining, 0);
    assert_eq!(m.hours_remaining, 0);
    assert_eq!(m.days_elapsed, m.total_days);

    let m = calculate(start, end, at(20, 0), grace()).unwrap();
    assert!(m.is_expired);
    assert!(!m.is_in_grace_period);
    assert_eq!(m.progress_percentage, 100.0);
  }

  #[test]
  fn test_before_start_is_clamped() {
    let start = at(10, 0);
    let end = at(20, 0);
    let m = calculate(start, end, at(5, 0), grace()).unwrap();

    assert_eq!(m.days_elapsed, 0);
    assert_eq!(m.progress_percentage, 0.0);
  }

  #[test]
  fn test_progress_is_bounded() {
    let start = at(1, 0);
    let end = at(31, 0);
    for day in 1..=31 {
      for hour in [0, 7, 23] {
        let m = calculate(start, end, at(day, hour), grace()).unwrap();
        assert!((0.0..=100.0).contains(&m.progress_percentage));
        assert_eq!(m.is_expired, at(day, hour) > end);
        assert_eq!(
          m.is_expiring_soon,
          !m.is_expired && m.days_remaining <= 7
        );
      }
    }
  }

  #[test]
  fn test_rejects_inverted_dates() {
    assert!(matches!(
      calculate(at(2, 0), at(1, 0), at(1, 0), grace()),
      Err(Error::InvalidRecord(_))
    ));
    assert!(matches!(
      calculate(at(1, 0), at(1, 0), at(1, 0), grace()),
      Err(Error::InvalidRecord(_))
    ));
  }
}
