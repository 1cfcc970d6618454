//! Error taxonomy shared by the engine and the API surface.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("authentication required")]
  Unauthenticated,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("rate limited; retry after {}s", retry_after.as_secs())]
  RateLimited { retry_after: Duration },

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend failure. Used as `.map_err(Error::store)`.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// `true` for conditions the user can resolve by acting differently
  /// (waiting out a cooldown, picking another username). Everything else is
  /// either a caller bug or a fatal backend failure.
  pub fn is_retriable(&self) -> bool {
    matches!(self, Self::RateLimited { .. } | Self::Conflict(_))
  }

  /// Stable machine-readable discriminant, surfaced in API error bodies.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Unauthenticated => "unauthenticated",
      Self::NotFound(_) => "not_found",
      Self::Conflict(_) => "conflict",
      Self::RateLimited { .. } => "rate_limited",
      Self::Forbidden(_) => "forbidden",
      Self::Validation(_) => "validation",
      Self::Store(_) => "internal",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_rate_limit_and_conflict_are_retriable() {
    assert!(Error::RateLimited { retry_after: Duration::from_secs(3) }.is_retriable());
    assert!(Error::Conflict("username taken".into()).is_retriable());
    assert!(!Error::Forbidden("nope".into()).is_retriable());
    assert!(!Error::NotFound("post".into()).is_retriable());
    assert!(!Error::Unauthenticated.is_retriable());
  }

  #[test]
  fn rate_limited_message_carries_seconds() {
    let e = Error::RateLimited { retry_after: Duration::from_secs(42) };
    assert_eq!(e.to_string(), "rate limited; retry after 42s");
    assert_eq!(e.kind(), "rate_limited");
  }
}
