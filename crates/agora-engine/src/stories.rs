//! Ephemeral stories.
//!
//! Visibility is `created_at <= now < expires_at`, evaluated on every read.
//! Nothing here ever deletes a story.

use std::collections::HashMap;

use agora_core::{
  Error, Id, Result,
  clock::Clock,
  content::{NewStory, Story, StoryReel, StorySummary},
  ratelimit::ActionKind,
  store::SocialStore,
};

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  pub async fn create_story(
    &self,
    viewer: Id,
    body: Option<&str>,
    image_ref: Option<&str>,
  ) -> Result<Story> {
    let input = NewStory::new(viewer, body, image_ref)?;
    self.require_profile(viewer).await?;
    self.throttle(viewer, ActionKind::Story).await?;
    self.store.insert_story(input, self.now()).await.map_err(Error::store)
  }

  /// The latest unexpired story of the viewer and each followee, newest first.
  pub async fn story_tray(&self, viewer: Id) -> Result<Vec<StorySummary>> {
    let (followees, blocked) =
      tokio::try_join!(self.store.followees(viewer), self.store.block_relations(viewer))
        .map_err(Error::store)?;
    let mut authors: Vec<Id> = std::iter::once(viewer)
      .chain(followees)
      .filter(|a| !blocked.contains(a))
      .collect();
    authors.sort_unstable();
    authors.dedup();

    // Newest first, so the first story seen per author is their latest.
    let now = self.now();
    let stories = self.store.visible_stories(&authors, now).await.map_err(Error::store)?;
    let mut order: Vec<Id> = Vec::new();
    let mut tray: HashMap<Id, (Story, usize)> = HashMap::new();
    for story in stories.into_iter().filter(|s| s.is_visible_at(now)) {
      match tray.get_mut(&story.author_id) {
        Some((_, count)) => *count += 1,
        None => {
          order.push(story.author_id);
          tray.insert(story.author_id, (story, 1));
        }
      }
    }

    let mut authors: HashMap<Id, _> = self
      .store
      .profiles_by_ids(&order)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|p| (p.id, p.summary()))
      .collect();

    Ok(
      order
        .into_iter()
        .filter_map(|id| {
          let (latest, count) = tray.remove(&id)?;
          Some(StorySummary { author: authors.remove(&id), latest, count })
        })
        .collect(),
    )
  }

  /// Every unexpired story of `author`, oldest first, positioned at the
  /// first one.
  pub async fn story_reel(&self, viewer: Id, author: Id) -> Result<StoryReel> {
    let profile = self.require_profile(author).await?;
    self.require_access(Some(viewer), &profile).await?;

    let now = self.now();
    let mut stories: Vec<Story> = self
      .store
      .visible_stories(&[author], now)
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|s| s.is_visible_at(now))
      .collect();
    stories.reverse();
    Ok(StoryReel::new(Some(profile.summary()), stories))
  }
}
