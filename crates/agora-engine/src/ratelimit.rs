//! Rate Limiter: a per-(user, action) cooldown, not a token bucket.
//!
//! Only the most recent allowed action is remembered. An attempt inside the
//! window is denied without moving the window.

use std::time::Duration as StdDuration;

use agora_core::{
  Error, Id, Result,
  clock::Clock,
  ratelimit::{ActionKind, RateDecision},
  store::SocialStore,
};
use tracing::debug;

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  /// Gate `user`'s `kind` action behind a cooldown of `window`. Returns
  /// `true` (and records the attempt) when the action may proceed.
  pub async fn allow(&self, user: Id, kind: &ActionKind, window: StdDuration) -> Result<bool> {
    Ok(self.check_rate(user, kind, window).await?.is_allowed())
  }

  /// Apply the configured cooldown for `kind`, failing with
  /// [`Error::RateLimited`] while it is active.
  ///
  /// Call this after every validation and permission check. An allowed
  /// decision records the slot immediately, so a store failure on the
  /// write that follows still counts against the cooldown.
  pub(crate) async fn throttle(&self, user: Id, kind: ActionKind) -> Result<()> {
    let window = self.config.cooldown(&kind);
    match self.check_rate(user, &kind, window).await? {
      RateDecision::Allowed => Ok(()),
      RateDecision::Denied { retry_after } => Err(Error::RateLimited { retry_after }),
    }
  }

  async fn check_rate(
    &self,
    user: Id,
    kind: &ActionKind,
    window: StdDuration,
  ) -> Result<RateDecision> {
    if window.is_zero() {
      return Ok(RateDecision::Allowed);
    }
    let decision = self
      .store
      .rate_limit(user, kind.key(), window, self.now())
      .await
      .map_err(Error::store)?;
    if let RateDecision::Denied { retry_after } = decision {
      debug!(%user, action = %kind, retry_after_secs = retry_after.as_secs(), "rate limited");
    }
    Ok(decision)
  }
}
