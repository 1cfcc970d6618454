//! Feed Composer: home, explore, search and per-author listings.
//!
//! Home and author feeds page by keyset over `(created_at, id)`. Explore ranks
//! a bounded window of recent posts by like count on every request; no score
//! is stored anywhere.

use std::collections::{HashMap, HashSet};

use agora_core::{
  Error, Id, Result,
  clock::Clock,
  content::Post,
  cursor::Cursor,
  engagement::{FeedPage, SearchResults},
  store::{PostQuery, SocialStore},
};

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  /// Posts by the viewer and everyone they follow, newest first, minus any
  /// author with a block edge to or from the viewer.
  pub async fn home_feed(
    &self,
    viewer: Id,
    cursor: Option<&str>,
    limit: Option<usize>,
  ) -> Result<FeedPage> {
    let limit = self.config.page_size(limit);
    let after = Cursor::parse(cursor)?;

    let (followees, blocked) =
      tokio::try_join!(self.store.followees(viewer), self.store.block_relations(viewer))
        .map_err(Error::store)?;
    let blocked: HashSet<Id> = blocked.into_iter().collect();

    let mut authors: Vec<Id> = std::iter::once(viewer)
      .chain(followees)
      .filter(|a| !blocked.contains(a))
      .collect();
    authors.sort_unstable();
    authors.dedup();
    if authors.is_empty() {
      return Ok(FeedPage::empty());
    }

    let query = PostQuery { authors: Some(authors), after, limit: limit + 1, ..Default::default() };
    let posts = self.store.find_posts(&query).await.map_err(Error::store)?;
    self.chronological_page(Some(viewer), posts, limit).await
  }

  /// Recent posts ranked by like count, newest first among ties.
  pub async fn explore_feed(
    &self,
    viewer: Option<Id>,
    cursor: Option<&str>,
    limit: Option<usize>,
  ) -> Result<FeedPage> {
    let limit = self.config.page_size(limit);
    let after = Cursor::parse(cursor)?;
    if after.is_some_and(|c| c.like_count.is_none()) {
      return Err(Error::Validation("cursor does not belong to the explore feed".into()));
    }

    let query = PostQuery {
      exclude_authors: self.block_list(viewer).await?,
      since: Some(self.now() - self.config.trending_window()),
      enforce_privacy: true,
      viewer,
      limit: self.config.explore_candidate_limit,
      ..Default::default()
    };
    let candidates = self.store.find_posts(&query).await.map_err(Error::store)?;
    if candidates.is_empty() {
      return Ok(FeedPage::empty());
    }

    let ids: Vec<Id> = candidates.iter().map(|p| p.id).collect();
    let mut likes = HashMap::with_capacity(ids.len());
    for batch in ids.chunks(self.config.max_page_size.max(1)) {
      likes.extend(self.store.like_counts(batch).await.map_err(Error::store)?);
    }

    let mut ranked: Vec<(Cursor, Post)> = candidates
      .into_iter()
      .map(|p| {
        let key = Cursor::ranked(likes.get(&p.id).copied().unwrap_or(0), p.created_at, p.id);
        (key, p)
      })
      .collect();
    ranked.sort_by(|a, b| a.0.feed_order(&b.0));

    let mut page: Vec<(Cursor, Post)> = ranked
      .into_iter()
      .filter(|(key, _)| after.is_none_or(|c| c.precedes(key)))
      .take(limit + 1)
      .collect();
    let next_cursor = if page.len() > limit {
      page.truncate(limit);
      page.last().map(|(key, _)| key.encode())
    } else {
      None
    };

    let items = self.enrich(viewer, page.into_iter().map(|(_, p)| p).collect()).await?;
    Ok(FeedPage { items, next_cursor })
  }

  /// Case-insensitive substring search over post bodies and profile names.
  /// A blank query matches nothing.
  pub async fn search(
    &self,
    query: &str,
    viewer: Option<Id>,
    limit: Option<usize>,
  ) -> Result<SearchResults> {
    let text = query.trim();
    if text.is_empty() {
      return Ok(SearchResults { posts: Vec::new(), profiles: Vec::new() });
    }
    let limit = self.config.page_size(limit);
    let blocked = self.block_list(viewer).await?;

    let post_query = PostQuery {
      exclude_authors: blocked.clone(),
      text: Some(text.to_owned()),
      enforce_privacy: true,
      viewer,
      limit,
      ..Default::default()
    };
    let (posts, profiles) = tokio::try_join!(
      self.store.find_posts(&post_query),
      self.store.search_profiles(text, viewer, &blocked, limit),
    )
    .map_err(Error::store)?;

    Ok(SearchResults {
      posts:    self.enrich(viewer, posts).await?,
      profiles: profiles.iter().map(|p| p.summary()).collect(),
    })
  }

  /// One author's posts, newest first. Private authors are only readable by
  /// themselves and their followers.
  pub async fn user_posts(
    &self,
    viewer: Option<Id>,
    author: Id,
    cursor: Option<&str>,
    limit: Option<usize>,
  ) -> Result<FeedPage> {
    let profile = self.require_profile(author).await?;
    self.require_access(viewer, &profile).await?;

    let limit = self.config.page_size(limit);
    let query = PostQuery {
      authors: Some(vec![author]),
      after: Cursor::parse(cursor)?,
      limit: limit + 1,
      ..Default::default()
    };
    let posts = self.store.find_posts(&query).await.map_err(Error::store)?;
    self.chronological_page(viewer, posts, limit).await
  }

  /// Everyone with a block edge to or from `viewer`.
  pub(crate) async fn block_list(&self, viewer: Option<Id>) -> Result<Vec<Id>> {
    match viewer {
      Some(v) => self.store.block_relations(v).await.map_err(Error::store),
      None => Ok(Vec::new()),
    }
  }

  /// `posts` holds up to `limit + 1` rows; the extra row only signals that
  /// another page exists.
  async fn chronological_page(
    &self,
    viewer: Option<Id>,
    mut posts: Vec<Post>,
    limit: usize,
  ) -> Result<FeedPage> {
    let next_cursor = if posts.len() > limit {
      posts.truncate(limit);
      posts.last().map(|p| Cursor::new(p.created_at, p.id).encode())
    } else {
      None
    };
    Ok(FeedPage { items: self.enrich(viewer, posts).await?, next_cursor })
  }
}
