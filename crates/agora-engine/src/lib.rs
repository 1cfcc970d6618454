//! The Agora engine: feeds, engagement, notifications, stories, verification
//! and the profile registry, layered over any [`SocialStore`].
//!
//! The engine holds no mutable state of its own. Every operation is an
//! independent unit of work against the store, with time supplied by a
//! [`Clock`] so cooldowns and expiry can be tested deterministically.
//!
//! ```rust,ignore
//! let store = Arc::new(SqliteStore::open("agora.db").await?);
//! let engine = Engine::new(store, SystemClock, EngineConfig::default());
//! let page = engine.home_feed(viewer, None, None).await?;
//! ```

pub mod config;

mod engagement;
mod fanout;
mod feed;
mod graph;
mod notifications;
mod posts;
mod profiles;
mod ratelimit;
mod recommendations;
mod stories;
mod verification;

use std::sync::Arc;

use agora_core::{
  Error, Id, Result,
  clock::{Clock, SystemClock},
  content::Post,
  profile::Profile,
  store::SocialStore,
};
use chrono::{DateTime, Utc};

pub use config::{ConfigError, EngineConfig};

/// Entry point for every engine operation.
pub struct Engine<S, C = SystemClock> {
  store:  Arc<S>,
  clock:  C,
  config: EngineConfig,
}

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  pub fn new(store: Arc<S>, clock: C, config: EngineConfig) -> Self {
    Self { store, clock, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  fn now(&self) -> DateTime<Utc> { self.clock.now() }

  async fn require_profile(&self, id: Id) -> Result<Profile> {
    self
      .store
      .get_profile(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("profile {id}")))
  }

  async fn require_admin(&self, id: Id) -> Result<Profile> {
    let profile = self.require_profile(id).await?;
    if !profile.is_admin() {
      return Err(Error::Forbidden("admin role required".into()));
    }
    Ok(profile)
  }

  async fn has_block_relation(&self, a: Id, b: Id) -> Result<bool> {
    let (ab, ba) = tokio::try_join!(self.store.is_blocked(a, b), self.store.is_blocked(b, a))
      .map_err(Error::store)?;
    Ok(ab || ba)
  }

  /// Whether `viewer` may see `author`'s content.
  async fn access(&self, viewer: Option<Id>, author: &Profile) -> Result<Access> {
    let Some(viewer) = viewer else {
      return Ok(if author.is_private { Access::Private } else { Access::Visible });
    };
    if viewer == author.id {
      return Ok(Access::Visible);
    }
    if self.has_block_relation(viewer, author.id).await? {
      return Ok(Access::Blocked);
    }
    if author.is_private
      && !self.store.is_following(viewer, author.id).await.map_err(Error::store)?
    {
      return Ok(Access::Private);
    }
    Ok(Access::Visible)
  }

  /// Like [`Self::access`], but as an error: blocked content does not
  /// exist for the viewer, private content is forbidden.
  async fn require_access(&self, viewer: Option<Id>, author: &Profile) -> Result<()> {
    match self.access(viewer, author).await? {
      Access::Visible => Ok(()),
      Access::Blocked => Err(Error::NotFound(format!("profile {}", author.id))),
      Access::Private => Err(Error::Forbidden(format!("@{} is private", author.username))),
    }
  }

  /// Fetch a post the viewer is allowed to see. Posts hidden by a block or a
  /// private author are reported as missing.
  async fn visible_post(&self, viewer: Option<Id>, id: Id) -> Result<Post> {
    let missing = || Error::NotFound(format!("post {id}"));
    let post = self.store.get_post(id).await.map_err(Error::store)?.ok_or_else(missing)?;
    let author = self
      .store
      .get_profile(post.author_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(missing)?;
    match self.access(viewer, &author).await? {
      Access::Visible => Ok(post),
      Access::Blocked | Access::Private => Err(missing()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
  Visible,
  Blocked,
  Private,
}
