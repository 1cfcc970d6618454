//! The time seam.
//!
//! Every cooldown, expiry and trending window is evaluated against a
//! [`Clock`] owned by the engine. The store never reads the wall clock; it
//! receives `now` as an argument.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
  inner: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { inner: Arc::new(Mutex::new(start)) }
  }

  pub fn set(&self, at: DateTime<Utc>) {
    *self.inner.lock().unwrap_or_else(|p| p.into_inner()) = at;
  }

  pub fn advance(&self, by: Duration) {
    let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
    *guard += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.inner.lock().unwrap_or_else(|p| p.into_inner())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn manual_clock_clones_share_time() {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    let other = clock.clone();

    clock.advance(Duration::minutes(5));
    assert_eq!(other.now(), start + Duration::minutes(5));

    other.set(start);
    assert_eq!(clock.now(), start);
  }
}
