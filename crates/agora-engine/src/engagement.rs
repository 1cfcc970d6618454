//! Engagement Aggregator and like mutations.
//!
//! Counts are always computed as grouped queries over a whole batch of post
//! ids, never one query per post. The like-count, comment-count, viewer-like
//! and author lookups for a batch run concurrently; if any of them fails the
//! whole enrichment fails.

use std::collections::{HashMap, HashSet};

use agora_core::{
  Error, Id, Result,
  clock::Clock,
  content::Post,
  engagement::{Engagement, FeedItem, LikeState},
  notification::NotificationKind,
  profile::ProfileSummary,
  store::SocialStore,
};

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  // ─── Aggregation ───────────────────────────────────────────────────────────

  /// Engagement for each of `post_ids` as seen by `viewer`. Every requested id
  /// is present in the result; ids of missing posts map to zero counts.
  pub async fn engagement(
    &self,
    viewer: Option<Id>,
    post_ids: &[Id],
  ) -> Result<HashMap<Id, Engagement>> {
    let mut out = HashMap::with_capacity(post_ids.len());
    for batch in post_ids.chunks(self.batch_size()) {
      let (likes, comments, liked) = tokio::try_join!(
        self.store.like_counts(batch),
        self.store.comment_counts(batch),
        self.liked_by(viewer, batch),
      )
      .map_err(Error::store)?;
      for id in batch {
        out.insert(*id, Engagement {
          like_count:       likes.get(id).copied().unwrap_or(0),
          comment_count:    comments.get(id).copied().unwrap_or(0),
          viewer_has_liked: liked.contains(id),
        });
      }
    }
    Ok(out)
  }

  /// Attach authors and engagement to `posts`, preserving their order.
  pub(crate) async fn enrich(&self, viewer: Option<Id>, posts: Vec<Post>) -> Result<Vec<FeedItem>> {
    let mut items = Vec::with_capacity(posts.len());
    let mut posts = posts.into_iter().peekable();
    while posts.peek().is_some() {
      let batch: Vec<Post> = posts.by_ref().take(self.batch_size()).collect();
      let ids: Vec<Id> = batch.iter().map(|p| p.id).collect();
      let mut author_ids: Vec<Id> = batch.iter().map(|p| p.author_id).collect();
      author_ids.sort_unstable();
      author_ids.dedup();

      let (likes, comments, liked, authors) = tokio::try_join!(
        self.store.like_counts(&ids),
        self.store.comment_counts(&ids),
        self.liked_by(viewer, &ids),
        self.store.profiles_by_ids(&author_ids),
      )
      .map_err(Error::store)?;

      let authors: HashMap<Id, ProfileSummary> =
        authors.into_iter().map(|p| (p.id, p.summary())).collect();
      items.extend(batch.into_iter().map(|post| {
        let engagement = Engagement {
          like_count:       likes.get(&post.id).copied().unwrap_or(0),
          comment_count:    comments.get(&post.id).copied().unwrap_or(0),
          viewer_has_liked: liked.contains(&post.id),
        };
        FeedItem { author: authors.get(&post.author_id).cloned(), post, engagement }
      }));
    }
    Ok(items)
  }

  /// Posts are aggregated in batches no larger than one page.
  fn batch_size(&self) -> usize { self.config.max_page_size.max(1) }

  async fn liked_by(&self, viewer: Option<Id>, ids: &[Id]) -> Result<HashSet<Id>, S::Error> {
    match viewer {
      Some(viewer) => self.store.liked_posts(viewer, ids).await,
      None => Ok(HashSet::new()),
    }
  }

  // ─── Mutations ─────────────────────────────────────────────────────────────

  /// Flip the viewer's like on a post.
  pub async fn toggle_like(&self, viewer: Id, post_id: Id) -> Result<LikeState> {
    self.require_profile(viewer).await?;
    let post = self.visible_post(Some(viewer), post_id).await?;
    let state = self
      .store
      .toggle_like(post_id, viewer, self.now())
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("post {post_id}")))?;
    self.after_like(viewer, &post, state).await;
    Ok(state)
  }

  /// Idempotent like. Liking twice leaves one like and one notification.
  pub async fn like(&self, viewer: Id, post_id: Id) -> Result<LikeState> {
    self.set_like(viewer, post_id, true).await
  }

  /// Idempotent unlike. Never notifies.
  pub async fn unlike(&self, viewer: Id, post_id: Id) -> Result<LikeState> {
    self.set_like(viewer, post_id, false).await
  }

  async fn set_like(&self, viewer: Id, post_id: Id, liked: bool) -> Result<LikeState> {
    self.require_profile(viewer).await?;
    let post = self.visible_post(Some(viewer), post_id).await?;
    let state = self
      .store
      .set_like(post_id, viewer, liked, self.now())
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("post {post_id}")))?;
    self.after_like(viewer, &post, state).await;
    Ok(state)
  }

  async fn after_like(&self, viewer: Id, post: &Post, state: LikeState) {
    if state.liked && state.changed {
      self.fan_out(viewer, post.author_id, NotificationKind::Like { post_id: post.id }).await;
    }
  }
}
