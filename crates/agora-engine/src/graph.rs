//! Follow and block edges.

use std::collections::HashMap;

use agora_core::{
  Error, Id, Result,
  clock::Clock,
  notification::NotificationKind,
  profile::ProfileSummary,
  ratelimit::ActionKind,
  store::SocialStore,
};

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  /// Idempotent. Returns `true` if a new edge was created; only a new edge
  /// notifies the followee.
  pub async fn follow(&self, viewer: Id, target: Id) -> Result<bool> {
    if viewer == target {
      return Err(Error::Forbidden("cannot follow yourself".into()));
    }
    tokio::try_join!(self.require_profile(viewer), self.require_profile(target))?;
    if self.has_block_relation(viewer, target).await? {
      return Err(Error::Forbidden("cannot follow a blocked user".into()));
    }
    self.throttle(viewer, ActionKind::Follow).await?;

    let created = self.store.follow(viewer, target, self.now()).await.map_err(Error::store)?;
    if created {
      self.fan_out(viewer, target, NotificationKind::Follow).await;
    }
    Ok(created)
  }

  /// Idempotent. Unfollowing a user you do not follow is a no-op.
  pub async fn unfollow(&self, viewer: Id, target: Id) -> Result<bool> {
    self.store.unfollow(viewer, target).await.map_err(Error::store)
  }

  pub async fn is_following(&self, follower: Id, followee: Id) -> Result<bool> {
    self.store.is_following(follower, followee).await.map_err(Error::store)
  }

  /// Blocking leaves follow edges in place; feeds and search filter blocked
  /// authors at read time.
  pub async fn block(&self, viewer: Id, target: Id) -> Result<bool> {
    if viewer == target {
      return Err(Error::Forbidden("cannot block yourself".into()));
    }
    tokio::try_join!(self.require_profile(viewer), self.require_profile(target))?;
    self.store.block(viewer, target, self.now()).await.map_err(Error::store)
  }

  pub async fn unblock(&self, viewer: Id, target: Id) -> Result<bool> {
    self.store.unblock(viewer, target).await.map_err(Error::store)
  }

  pub async fn followers(&self, viewer: Option<Id>, user: Id) -> Result<Vec<ProfileSummary>> {
    let profile = self.require_profile(user).await?;
    self.require_access(viewer, &profile).await?;
    let ids = self.store.followers(user).await.map_err(Error::store)?;
    self.summaries(&ids).await
  }

  pub async fn following(&self, viewer: Option<Id>, user: Id) -> Result<Vec<ProfileSummary>> {
    let profile = self.require_profile(user).await?;
    self.require_access(viewer, &profile).await?;
    let ids = self.store.followees(user).await.map_err(Error::store)?;
    self.summaries(&ids).await
  }

  /// Profile summaries for `ids`, in the same order. Unknown ids are dropped.
  pub(crate) async fn summaries(&self, ids: &[Id]) -> Result<Vec<ProfileSummary>> {
    let mut by_id: HashMap<Id, ProfileSummary> = self
      .store
      .profiles_by_ids(ids)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|p| (p.id, p.summary()))
      .collect();
    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
  }
}
