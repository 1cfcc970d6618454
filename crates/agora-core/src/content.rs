//! Posts, comments and ephemeral stories.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Id, Result, profile::ProfileSummary};

pub const POST_MAX_LEN: usize = 2000;
pub const COMMENT_MAX_LEN: usize = 1000;
pub const STORY_MAX_LEN: usize = 500;

/// How long a story stays visible after creation.
pub fn story_ttl() -> Duration { Duration::hours(24) }

// ─── Posts ───────────────────────────────────────────────────────────────────

/// A post. Owned by its author; content is never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub id:         Id,
  pub author_id:  Id,
  pub body:       String,
  pub image_ref:  Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
  pub author_id: Id,
  pub body:      String,
  pub image_ref: Option<String>,
}

impl NewPost {
  /// Trim and bound-check the body; blank image references become `None`.
  pub fn new(author_id: Id, body: &str, image_ref: Option<&str>) -> Result<Self> {
    Ok(Self {
      author_id,
      body: bounded_text("post", body, POST_MAX_LEN)?,
      image_ref: clean_ref(image_ref),
    })
  }
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub id:         Id,
  pub post_id:    Id,
  pub author_id:  Id,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
  pub post_id:   Id,
  pub author_id: Id,
  pub body:      String,
}

impl NewComment {
  pub fn new(post_id: Id, author_id: Id, body: &str) -> Result<Self> {
    Ok(Self { post_id, author_id, body: bounded_text("comment", body, COMMENT_MAX_LEN)? })
  }
}

/// A comment with its author rendered for display.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
  pub comment: Comment,
  pub author:  Option<ProfileSummary>,
}

/// Comments on one post, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct CommentPage {
  pub items:       Vec<CommentView>,
  pub next_cursor: Option<String>,
}

// ─── Stories ─────────────────────────────────────────────────────────────────

/// Ephemeral content. `expires_at` is fixed at creation and never mutated;
/// visibility is a pure time predicate, so nothing ever deletes a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
  pub id:         Id,
  pub author_id:  Id,
  pub body:       Option<String>,
  pub image_ref:  Option<String>,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Story {
  pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
    self.created_at <= now && now < self.expires_at
  }
}

#[derive(Debug, Clone)]
pub struct NewStory {
  pub author_id: Id,
  pub body:      Option<String>,
  pub image_ref: Option<String>,
}

impl NewStory {
  pub fn new(author_id: Id, body: Option<&str>, image_ref: Option<&str>) -> Result<Self> {
    let body = match body.map(str::trim).filter(|b| !b.is_empty()) {
      Some(b) => Some(bounded_text("story", b, STORY_MAX_LEN)?),
      None => None,
    };
    let image_ref = clean_ref(image_ref);
    if body.is_none() && image_ref.is_none() {
      return Err(Error::Validation("story needs text or an image".into()));
    }
    Ok(Self { author_id, body, image_ref })
  }
}

/// One entry in the story tray: an author's most recent unexpired story.
#[derive(Debug, Clone, Serialize)]
pub struct StorySummary {
  pub author: Option<ProfileSummary>,
  pub latest: Story,
  /// Number of unexpired stories the author currently has.
  pub count:  usize,
}

/// An author's unexpired stories in chronological order, with a cursor that
/// auto-advances. Reaching the end means the viewer leaves the reel.
#[derive(Debug, Clone, Serialize)]
pub struct StoryReel {
  pub author:   Option<ProfileSummary>,
  pub stories:  Vec<Story>,
  pub position: usize,
}

impl StoryReel {
  pub fn new(author: Option<ProfileSummary>, stories: Vec<Story>) -> Self {
    Self { author, stories, position: 0 }
  }

  pub fn current(&self) -> Option<&Story> { self.stories.get(self.position) }

  /// Move to the next story. Returns `None` once the reel is exhausted.
  pub fn advance(&mut self) -> Option<&Story> {
    if self.position + 1 < self.stories.len() {
      self.position += 1;
      self.stories.get(self.position)
    } else {
      self.position = self.stories.len();
      None
    }
  }

  /// Step back one story; stays on the first.
  pub fn back(&mut self) -> Option<&Story> {
    self.position = self.position.saturating_sub(1).min(self.stories.len().saturating_sub(1));
    self.stories.get(self.position)
  }

  pub fn is_finished(&self) -> bool { self.position >= self.stories.len() }
}

// ─── Validation helpers ──────────────────────────────────────────────────────

fn bounded_text(what: &str, raw: &str, max: usize) -> Result<String> {
  let text = raw.trim();
  if text.is_empty() {
    return Err(Error::Validation(format!("{what} body must not be empty")));
  }
  if text.chars().count() > max {
    return Err(Error::Validation(format!("{what} body exceeds {max} characters")));
  }
  Ok(text.to_owned())
}

fn clean_ref(raw: Option<&str>) -> Option<String> {
  raw.map(str::trim).filter(|r| !r.is_empty()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;

  fn story_at(created_at: DateTime<Utc>) -> Story {
    Story {
      id: Uuid::new_v4(),
      author_id: Uuid::new_v4(),
      body: Some("hi".into()),
      image_ref: None,
      created_at,
      expires_at: created_at + story_ttl(),
    }
  }

  #[test]
  fn story_visibility_window() {
    let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let story = story_at(t);

    assert!(story.is_visible_at(t));
    assert!(story.is_visible_at(t + Duration::hours(23) + Duration::minutes(59)));
    assert!(!story.is_visible_at(t + Duration::hours(24)));
    assert!(!story.is_visible_at(t + Duration::hours(24) + Duration::minutes(1)));
    assert!(!story.is_visible_at(t - Duration::seconds(1)));
  }

  #[test]
  fn post_body_is_trimmed_and_bounded() {
    let author = Uuid::new_v4();
    let post = NewPost::new(author, "  hello  ", Some("   ")).unwrap();
    assert_eq!(post.body, "hello");
    assert!(post.image_ref.is_none());

    assert!(matches!(NewPost::new(author, "   ", None), Err(Error::Validation(_))));
    assert!(NewPost::new(author, &"a".repeat(POST_MAX_LEN), None).is_ok());
    assert!(NewPost::new(author, &"a".repeat(POST_MAX_LEN + 1), None).is_err());
  }

  #[test]
  fn story_needs_body_or_image() {
    let author = Uuid::new_v4();
    assert!(NewStory::new(author, Some("  "), None).is_err());
    assert!(NewStory::new(author, None, Some("img://1")).is_ok());
    assert!(NewStory::new(author, Some(&"x".repeat(STORY_MAX_LEN + 1)), None).is_err());
  }

  #[test]
  fn reel_auto_advances_to_the_end() {
    let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let stories: Vec<_> = (0..3).map(|i| story_at(t + Duration::minutes(i))).collect();
    let ids: Vec<_> = stories.iter().map(|s| s.id).collect();
    let mut reel = StoryReel::new(None, stories);

    assert_eq!(reel.current().map(|s| s.id), Some(ids[0]));
    assert_eq!(reel.advance().map(|s| s.id), Some(ids[1]));
    assert_eq!(reel.back().map(|s| s.id), Some(ids[0]));
    assert_eq!(reel.back().map(|s| s.id), Some(ids[0]));
    reel.advance();
    assert_eq!(reel.advance().map(|s| s.id), Some(ids[2]));
    assert!(reel.advance().is_none());
    assert!(reel.is_finished());
    assert!(reel.current().is_none());
  }

  #[test]
  fn empty_reel_is_finished() {
    let mut reel = StoryReel::new(None, vec![]);
    assert!(reel.is_finished());
    assert!(reel.advance().is_none());
    assert!(reel.back().is_none());
  }
}
