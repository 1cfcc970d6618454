//! Engine tunables. Every field has a default so an empty `[engine]` table
//! (or none at all) yields a working configuration.

use std::{collections::HashMap, time::Duration as StdDuration};

use agora_core::ratelimit::ActionKind;
use chrono::Duration;
use serde::Deserialize;

/// Ten years. No window or cooldown may be longer.
const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;
const MAX_WINDOW_HOURS: u64 = MAX_WINDOW_SECS / 3600;
const MAX_WINDOW_DAYS: u64 = MAX_WINDOW_SECS / 86_400;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("engine.{field} = {value} exceeds the maximum of {max}")]
  OutOfRange { field: String, value: u64, max: u64 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Minimum gap between two posts by the same user. `0` disables the gate.
  pub post_cooldown_secs:      u64,
  pub comment_cooldown_secs:   u64,
  pub story_cooldown_secs:     u64,
  pub follow_cooldown_secs:    u64,
  /// Cooldowns for custom action keys.
  pub custom_cooldown_secs:    HashMap<String, u64>,
  /// How far back the explore feed looks.
  pub trending_window_hours:   u64,
  /// Upper bound on posts ranked per explore request.
  pub explore_candidate_limit: usize,
  /// Identical notifications inside this window are suppressed. `0`
  /// disables suppression.
  pub notification_dedup_secs: u64,
  pub username_cooldown_days:  u64,
  pub max_page_size:           usize,
  pub default_page_size:       usize,
  /// Profiles returned by the "who to follow" list when no limit is given.
  pub recommended_users_limit: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      post_cooldown_secs:      60,
      comment_cooldown_secs:   0,
      story_cooldown_secs:     0,
      follow_cooldown_secs:    0,
      custom_cooldown_secs:    HashMap::new(),
      trending_window_hours:   24,
      explore_candidate_limit: 500,
      notification_dedup_secs: 600,
      username_cooldown_days:  14,
      max_page_size:           50,
      default_page_size:       20,
      recommended_users_limit: 5,
    }
  }
}

impl EngineConfig {
  /// Reject windows and cooldowns too large to represent as a date offset.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let fixed = [
      ("post_cooldown_secs", self.post_cooldown_secs, MAX_WINDOW_SECS),
      ("comment_cooldown_secs", self.comment_cooldown_secs, MAX_WINDOW_SECS),
      ("story_cooldown_secs", self.story_cooldown_secs, MAX_WINDOW_SECS),
      ("follow_cooldown_secs", self.follow_cooldown_secs, MAX_WINDOW_SECS),
      ("trending_window_hours", self.trending_window_hours, MAX_WINDOW_HOURS),
      ("notification_dedup_secs", self.notification_dedup_secs, MAX_WINDOW_SECS),
      ("username_cooldown_days", self.username_cooldown_days, MAX_WINDOW_DAYS),
    ]
    .into_iter()
    .map(|(field, value, max)| (field.to_owned(), value, max));
    let custom = self
      .custom_cooldown_secs
      .iter()
      .map(|(key, &value)| (format!("custom_cooldown_secs.{key}"), value, MAX_WINDOW_SECS));

    for (field, value, max) in fixed.chain(custom) {
      if value > max {
        return Err(ConfigError::OutOfRange { field, value, max });
      }
    }
    Ok(())
  }

  /// The cooldown configured for `kind`; zero means unthrottled.
  pub fn cooldown(&self, kind: &ActionKind) -> StdDuration {
    let secs = match kind {
      ActionKind::Post => self.post_cooldown_secs,
      ActionKind::Comment => self.comment_cooldown_secs,
      ActionKind::Story => self.story_cooldown_secs,
      ActionKind::Follow => self.follow_cooldown_secs,
      ActionKind::Custom(key) => self.custom_cooldown_secs.get(key).copied().unwrap_or(0),
    };
    StdDuration::from_secs(secs.min(MAX_WINDOW_SECS))
  }

  // The accessors below clamp, so an unvalidated config never panics.

  pub fn trending_window(&self) -> Duration {
    Duration::hours(self.trending_window_hours.min(MAX_WINDOW_HOURS) as i64)
  }

  pub fn notification_dedup(&self) -> Option<Duration> {
    (self.notification_dedup_secs > 0)
      .then(|| Duration::seconds(self.notification_dedup_secs.min(MAX_WINDOW_SECS) as i64))
  }

  pub fn username_cooldown(&self) -> Duration {
    Duration::days(self.username_cooldown_days.min(MAX_WINDOW_DAYS) as i64)
  }

  /// Resolve a client-requested page size: default when absent, clamped to
  /// `1..=max_page_size`.
  pub fn page_size(&self, requested: Option<usize>) -> usize {
    let max = self.max_page_size.max(1);
    requested.unwrap_or(self.default_page_size).clamp(1, max)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_table_yields_defaults() {
    let config: EngineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.post_cooldown_secs, 60);
    assert_eq!(config.trending_window(), Duration::hours(24));
    assert_eq!(config.username_cooldown(), Duration::days(14));
    assert_eq!(config.notification_dedup(), Some(Duration::minutes(10)));
  }

  #[test]
  fn partial_override_keeps_other_defaults() {
    let config: EngineConfig =
      serde_json::from_str(r#"{"post_cooldown_secs": 5, "custom_cooldown_secs": {"dm": 3}}"#)
        .unwrap();
    assert_eq!(config.cooldown(&ActionKind::Post), StdDuration::from_secs(5));
    assert_eq!(config.cooldown(&ActionKind::Custom("dm".into())), StdDuration::from_secs(3));
    assert_eq!(config.cooldown(&ActionKind::Comment), StdDuration::ZERO);
    assert_eq!(config.max_page_size, 50);
  }

  #[test]
  fn page_size_is_clamped() {
    let config = EngineConfig::default();
    assert_eq!(config.page_size(None), 20);
    assert_eq!(config.page_size(Some(0)), 1);
    assert_eq!(config.page_size(Some(500)), 50);
  }

  #[test]
  fn defaults_validate() {
    assert!(EngineConfig::default().validate().is_ok());
  }

  #[test]
  fn oversized_windows_are_rejected() {
    let config: EngineConfig =
      serde_json::from_str(r#"{"trending_window_hours": 18446744073709551615}"#).unwrap();
    match config.validate() {
      Err(ConfigError::OutOfRange { field, value, .. }) => {
        assert_eq!(field, "trending_window_hours");
        assert_eq!(value, u64::MAX);
      }
      other => panic!("expected out-of-range error, got {other:?}"),
    }

    let config: EngineConfig =
      serde_json::from_str(r#"{"custom_cooldown_secs": {"dm": 999999999999}}"#).unwrap();
    assert!(matches!(
      config.validate(),
      Err(ConfigError::OutOfRange { field, .. }) if field == "custom_cooldown_secs.dm"
    ));
  }

  #[test]
  fn accessors_clamp_unvalidated_values() {
    let config = EngineConfig {
      trending_window_hours: u64::MAX,
      notification_dedup_secs: u64::MAX,
      username_cooldown_days: u64::MAX,
      post_cooldown_secs: u64::MAX,
      ..Default::default()
    };
    assert_eq!(config.trending_window(), Duration::days(3650));
    assert_eq!(config.username_cooldown(), Duration::days(3650));
    assert_eq!(config.notification_dedup(), Some(Duration::days(3650)));
    assert_eq!(config.cooldown(&ActionKind::Post), StdDuration::from_secs(315_360_000));
  }
}
