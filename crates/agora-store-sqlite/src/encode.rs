//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings. Timestamps are stored as
//! fixed-width RFC 3339 strings with microsecond precision, so string order is
//! time order. Enums use their strum spelling.

use std::str::FromStr;

use agora_core::{
  Id,
  content::{Comment, Post, Story},
  notification::{Notification, NotificationKind, NotificationType},
  profile::{Profile, Role},
  verification::{VerificationRequest, VerificationStatus},
};
use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use rusqlite::Row;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Id) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Id> { Ok(Id::parse_str(s)?) }

pub fn encode_uuids(ids: &[Id]) -> Vec<String> { ids.iter().copied().map(encode_uuid).collect() }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Drop precision the column cannot hold, so values handed back to callers
/// compare equal to what a later read returns.
pub fn stored_precision(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::UnknownEnum { column, value: s.to_owned() })
}

// ─── IN-list placeholders ────────────────────────────────────────────────────

/// `?{start}, ?{start+1}, …` for `n` bound parameters.
pub fn placeholders(start: usize, n: usize) -> String {
  (start..start + n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

/// Escape `%`, `_` and the escape character itself for `LIKE … ESCAPE '\'`.
///
/// The pattern is lowercased; compare it against `fold_case(column)`.
pub fn like_pattern(text: &str) -> String {
  let text = text.to_lowercase();
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PROFILE_COLUMNS: &str = "id, username, display_name, bio, avatar_ref, is_private, \
                                   is_verified, role, last_username_change, created_at";

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub id:                   String,
  pub username:             String,
  pub display_name:         String,
  pub bio:                  Option<String>,
  pub avatar_ref:           Option<String>,
  pub is_private:           bool,
  pub is_verified:          bool,
  pub role:                 String,
  pub last_username_change: Option<String>,
  pub created_at:           String,
}

impl RawProfile {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      username:             row.get(1)?,
      display_name:         row.get(2)?,
      bio:                  row.get(3)?,
      avatar_ref:           row.get(4)?,
      is_private:           row.get(5)?,
      is_verified:          row.get(6)?,
      role:                 row.get(7)?,
      last_username_change: row.get(8)?,
      created_at:           row.get(9)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      id:                   decode_uuid(&self.id)?,
      username:             self.username,
      display_name:         self.display_name,
      bio:                  self.bio,
      avatar_ref:           self.avatar_ref,
      is_private:           self.is_private,
      is_verified:          self.is_verified,
      role:                 decode_enum::<Role>("role", &self.role)?,
      last_username_change: decode_opt_dt(self.last_username_change)?,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

pub const POST_COLUMNS: &str = "p.id, p.author_id, p.body, p.image_ref, p.created_at";

pub struct RawPost {
  pub id:         String,
  pub author_id:  String,
  pub body:       String,
  pub image_ref:  Option<String>,
  pub created_at: String,
}

impl RawPost {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      author_id:  row.get(1)?,
      body:       row.get(2)?,
      image_ref:  row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      id:         decode_uuid(&self.id)?,
      author_id:  decode_uuid(&self.author_id)?,
      body:       self.body,
      image_ref:  self.image_ref,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const COMMENT_COLUMNS: &str = "id, post_id, author_id, body, created_at";

pub struct RawComment {
  pub id:         String,
  pub post_id:    String,
  pub author_id:  String,
  pub body:       String,
  pub created_at: String,
}

impl RawComment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      post_id:    row.get(1)?,
      author_id:  row.get(2)?,
      body:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      id:         decode_uuid(&self.id)?,
      post_id:    decode_uuid(&self.post_id)?,
      author_id:  decode_uuid(&self.author_id)?,
      body:       self.body,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const STORY_COLUMNS: &str = "id, author_id, body, image_ref, created_at, expires_at";

pub struct RawStory {
  pub id:         String,
  pub author_id:  String,
  pub body:       Option<String>,
  pub image_ref:  Option<String>,
  pub created_at: String,
  pub expires_at: String,
}

impl RawStory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      author_id:  row.get(1)?,
      body:       row.get(2)?,
      image_ref:  row.get(3)?,
      created_at: row.get(4)?,
      expires_at: row.get(5)?,
    })
  }

  pub fn into_story(self) -> Result<Story> {
    Ok(Story {
      id:         decode_uuid(&self.id)?,
      author_id:  decode_uuid(&self.author_id)?,
      body:       self.body,
      image_ref:  self.image_ref,
      created_at: decode_dt(&self.created_at)?,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str =
  "id, recipient_id, actor_id, kind, post_id, is_read, created_at";

pub struct RawNotification {
  pub id:           String,
  pub recipient_id: String,
  pub actor_id:     String,
  pub kind:         String,
  pub post_id:      Option<String>,
  pub is_read:      bool,
  pub created_at:   String,
}

impl RawNotification {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      recipient_id: row.get(1)?,
      actor_id:     row.get(2)?,
      kind:         row.get(3)?,
      post_id:      row.get(4)?,
      is_read:      row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    let id = decode_uuid(&self.id)?;
    let kind_type = decode_enum::<NotificationType>("notification kind", &self.kind)?;
    let post_id = self.post_id.as_deref().map(decode_uuid).transpose()?;
    let kind = NotificationKind::from_parts(kind_type, post_id)
      .ok_or(Error::CorruptNotification(id))?;

    Ok(Notification {
      id,
      recipient_id: decode_uuid(&self.recipient_id)?,
      actor_id: decode_uuid(&self.actor_id)?,
      kind,
      is_read: self.is_read,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const VERIFICATION_COLUMNS: &str = "id, user_id, bio, social_links, status, admin_notes, \
                                        decided_by, created_at, decided_at";

pub struct RawVerification {
  pub id:           String,
  pub user_id:      String,
  pub bio:          String,
  pub social_links: String,
  pub status:       String,
  pub admin_notes:  Option<String>,
  pub decided_by:   Option<String>,
  pub created_at:   String,
  pub decided_at:   Option<String>,
}

impl RawVerification {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      user_id:      row.get(1)?,
      bio:          row.get(2)?,
      social_links: row.get(3)?,
      status:       row.get(4)?,
      admin_notes:  row.get(5)?,
      decided_by:   row.get(6)?,
      created_at:   row.get(7)?,
      decided_at:   row.get(8)?,
    })
  }

  pub fn into_request(self) -> Result<VerificationRequest> {
    Ok(VerificationRequest {
      id:           decode_uuid(&self.id)?,
      user_id:      decode_uuid(&self.user_id)?,
      bio:          self.bio,
      social_links: serde_json::from_str(&self.social_links)?,
      status:       decode_enum::<VerificationStatus>("verification status", &self.status)?,
      admin_notes:  self.admin_notes,
      decided_by:   self.decided_by.as_deref().map(decode_uuid).transpose()?,
      created_at:   decode_dt(&self.created_at)?,
      decided_at:   decode_opt_dt(self.decided_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let later = base + Duration::microseconds(1);
    let much_later = base + Duration::seconds(1);
    assert!(encode_dt(base) < encode_dt(later));
    assert!(encode_dt(later) < encode_dt(much_later));
    assert_eq!(encode_dt(base).len(), encode_dt(later).len());
    assert_eq!(decode_dt(&encode_dt(later)).unwrap(), later);
  }

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
  }

  #[test]
  fn like_pattern_folds_case_beyond_ascii() {
    assert_eq!(like_pattern("ZÜRICH"), "%zürich%");
    assert_eq!(like_pattern("Été"), "%été%");
  }

  #[test]
  fn placeholder_lists() {
    assert_eq!(placeholders(1, 3), "?1, ?2, ?3");
    assert_eq!(placeholders(4, 1), "?4");
  }
}
