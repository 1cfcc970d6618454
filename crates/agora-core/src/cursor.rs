//! Opaque keyset cursors.
//!
//! A cursor names the last item of the previous page. Feeds order by
//! `(created_at, id)` descending; the explore feed additionally leads with
//! the like count. The id tie-break makes the order total even when
//! timestamps collide.
//!
//! On the wire a cursor is URL-safe base64 over a small JSON object, so
//! clients treat it as an opaque token.

use std::cmp::Ordering;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Id, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
  #[serde(rename = "l", default, skip_serializing_if = "Option::is_none")]
  pub like_count: Option<u64>,
  #[serde(rename = "t")]
  pub created_at: DateTime<Utc>,
  #[serde(rename = "i")]
  pub id:         Id,
}

impl Cursor {
  pub fn new(created_at: DateTime<Utc>, id: Id) -> Self {
    Self { like_count: None, created_at, id }
  }

  pub fn ranked(like_count: u64, created_at: DateTime<Utc>, id: Id) -> Self {
    Self { like_count: Some(like_count), created_at, id }
  }

  pub fn encode(&self) -> String {
    // Serialising three plain fields cannot fail.
    let json = serde_json::to_vec(self).unwrap_or_default();
    B64.encode(json)
  }

  pub fn decode(token: &str) -> Result<Self> {
    let bytes = B64
      .decode(token.trim())
      .map_err(|_| Error::Validation("malformed cursor".into()))?;
    serde_json::from_slice(&bytes).map_err(|_| Error::Validation("malformed cursor".into()))
  }

  /// Decode an optional token as received from a client.
  pub fn parse(token: Option<&str>) -> Result<Option<Self>> {
    token.filter(|t| !t.trim().is_empty()).map(Self::decode).transpose()
  }

  /// Order by `(like_count, created_at, id)`, all descending: `Less` means
  /// `self` comes first in the feed.
  pub fn feed_order(&self, other: &Self) -> Ordering {
    other
      .like_count
      .unwrap_or(0)
      .cmp(&self.like_count.unwrap_or(0))
      .then_with(|| other.created_at.cmp(&self.created_at))
      .then_with(|| other.id.cmp(&self.id))
  }

  /// Whether `key` sorts strictly after this cursor, i.e. belongs on a later
  /// page.
  pub fn precedes(&self, key: &Self) -> bool { self.feed_order(key) == Ordering::Less }
}

/// Bounded page size shared by every paginated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub cursor: Option<Cursor>,
  pub limit:  usize,
}

impl PageRequest {
  pub fn first(limit: usize) -> Self { Self { cursor: None, limit } }
}
