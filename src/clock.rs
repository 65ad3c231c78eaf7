use crate::prelude::*;

/// Source of "now" for every time-dependent decision.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime {
    Utc::now().naive_utc()
  }
}
