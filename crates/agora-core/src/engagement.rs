//! Engagement — aggregate interaction counts plus viewer-specific flags.

use serde::{Deserialize, Serialize};

use crate::{content::Post, profile::ProfileSummary};

/// Counts for one post as seen by one viewer. Anonymous viewers always get
/// `viewer_has_liked == false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
  pub like_count:       u64,
  pub comment_count:    u64,
  pub viewer_has_liked: bool,
}

/// Resulting state after a like mutation, so callers can update counters
/// without re-querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
  pub liked:      bool,
  pub like_count: u64,
  /// Whether the mutation actually changed anything. A repeated like (or
  /// unlike) is a no-op and reports `false`.
  #[serde(skip)]
  pub changed:    bool,
}

/// A post ready for display in any feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
  pub post:       Post,
  pub author:     Option<ProfileSummary>,
  pub engagement: Engagement,
}

/// One page of a feed. `next_cursor` is `None` on the last page.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
  pub items:       Vec<FeedItem>,
  pub next_cursor: Option<String>,
}

impl FeedPage {
  pub fn empty() -> Self { Self { items: Vec::new(), next_cursor: None } }
}

/// Combined result of a search across posts and profiles.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
  pub posts:    Vec<FeedItem>,
  pub profiles: Vec<ProfileSummary>,
}
