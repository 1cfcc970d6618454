//! Posts and comments.

use std::collections::HashMap;

use agora_core::{
  Error, Id, Result,
  clock::Clock,
  content::{Comment, CommentPage, CommentView, NewComment, NewPost, Post},
  cursor::{Cursor, PageRequest},
  engagement::FeedItem,
  notification::NotificationKind,
  ratelimit::ActionKind,
  store::{Deletion, SocialStore},
};

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  /// Validation runs before the cooldown so a rejected body does not burn
  /// the user's post slot.
  pub async fn create_post(&self, viewer: Id, body: &str, image_ref: Option<&str>) -> Result<Post> {
    let input = NewPost::new(viewer, body, image_ref)?;
    self.require_profile(viewer).await?;
    self.throttle(viewer, ActionKind::Post).await?;
    self.store.insert_post(input, self.now()).await.map_err(Error::store)
  }

  pub async fn get_post(&self, viewer: Option<Id>, id: Id) -> Result<FeedItem> {
    let post = self.visible_post(viewer, id).await?;
    let mut items = self.enrich(viewer, vec![post]).await?;
    items.pop().ok_or_else(|| Error::NotFound(format!("post {id}")))
  }

  /// Only the author may delete. Comments, likes and notifications about the
  /// post go with it.
  pub async fn delete_post(&self, viewer: Id, id: Id) -> Result<()> {
    match self.store.delete_post(id, viewer).await.map_err(Error::store)? {
      Deletion::Deleted => Ok(()),
      Deletion::NotFound => Err(Error::NotFound(format!("post {id}"))),
      Deletion::NotOwner => Err(Error::Forbidden("only the author can delete a post".into())),
    }
  }

  pub async fn add_comment(&self, viewer: Id, post_id: Id, body: &str) -> Result<Comment> {
    let input = NewComment::new(post_id, viewer, body)?;
    self.require_profile(viewer).await?;
    let post = self.visible_post(Some(viewer), post_id).await?;
    self.throttle(viewer, ActionKind::Comment).await?;

    let comment = self
      .store
      .insert_comment(input, self.now())
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("post {post_id}")))?;

    self.fan_out(viewer, post.author_id, NotificationKind::Comment { post_id }).await;
    Ok(comment)
  }

  /// Comments on a post, oldest first.
  pub async fn list_comments(
    &self,
    viewer: Option<Id>,
    post_id: Id,
    cursor: Option<&str>,
    limit: Option<usize>,
  ) -> Result<CommentPage> {
    self.visible_post(viewer, post_id).await?;
    let limit = self.config.page_size(limit);
    let page = PageRequest { cursor: Cursor::parse(cursor)?, limit: limit + 1 };

    let mut comments = self.store.comments_for_post(post_id, page).await.map_err(Error::store)?;
    let next_cursor = if comments.len() > limit {
      comments.truncate(limit);
      comments.last().map(|c| Cursor::new(c.created_at, c.id).encode())
    } else {
      None
    };

    let mut author_ids: Vec<Id> = comments.iter().map(|c| c.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();
    let authors: HashMap<Id, _> = self
      .store
      .profiles_by_ids(&author_ids)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|p| (p.id, p.summary()))
      .collect();

    let items = comments
      .into_iter()
      .map(|comment| CommentView { author: authors.get(&comment.author_id).cloned(), comment })
      .collect();
    Ok(CommentPage { items, next_cursor })
  }
}
