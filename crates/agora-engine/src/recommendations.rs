//! Admin-curated "who to follow" list.

use agora_core::{Error, Id, Result, clock::Clock, profile::ProfileSummary, store::SocialStore};
use tracing::info;

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  /// Idempotent. Returns `true` if `user` was newly added.
  pub async fn recommend_user(&self, admin: Id, user: Id) -> Result<bool> {
    self.require_admin(admin).await?;
    self.require_profile(user).await?;
    let added =
      self.store.add_recommended_user(user, admin, self.now()).await.map_err(Error::store)?;
    if added {
      info!(%user, %admin, "user recommended");
    }
    Ok(added)
  }

  pub async fn unrecommend_user(&self, admin: Id, user: Id) -> Result<bool> {
    self.require_admin(admin).await?;
    self.store.remove_recommended_user(user).await.map_err(Error::store)
  }

  /// Recommended profiles the viewer does not follow yet, newest
  /// recommendation first. Block relations are filtered out.
  pub async fn recommended_users(
    &self,
    viewer: Id,
    limit: Option<usize>,
  ) -> Result<Vec<ProfileSummary>> {
    let limit = limit
      .unwrap_or(self.config.recommended_users_limit)
      .clamp(1, self.config.max_page_size.max(1));
    let profiles = self.store.recommended_users(viewer, limit).await.map_err(Error::store)?;
    Ok(profiles.iter().map(|p| p.summary()).collect())
  }
}
