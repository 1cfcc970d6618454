//! Rate-limit keys and decisions.
//!
//! The limiter is a per-action cooldown: one action of a given kind per
//! window, measured from the single most recent allowed action. There is no
//! burst allowance.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// The write action being throttled. Unknown kinds are carried verbatim so
/// the limiter can be extended without touching this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
  Post,
  Comment,
  Story,
  Follow,
  Custom(String),
}

impl ActionKind {
  pub fn key(&self) -> &str {
    match self {
      Self::Post => "post",
      Self::Comment => "comment",
      Self::Story => "story",
      Self::Follow => "follow",
      Self::Custom(k) => k,
    }
  }
}

impl fmt::Display for ActionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
  /// The action may proceed; `now` has been recorded as the latest action.
  Allowed,
  /// The cooldown is still active.
  Denied { retry_after: Duration },
}

impl RateDecision {
  pub fn is_allowed(self) -> bool { matches!(self, Self::Allowed) }
}
