//! Profiles — identity records owned by the Profile Registry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Id, Result};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const DISPLAY_NAME_MAX_LEN: usize = 60;
pub const BIO_MAX_LEN: usize = 500;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin,
}

/// A user's public identity. The `id` is issued by the identity provider and
/// never changes; the username is unique (case-insensitively) and mutable
/// subject to a cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub id:                   Id,
  pub username:             String,
  pub display_name:         String,
  pub bio:                  Option<String>,
  /// Opaque reference into the object store; never dereferenced here.
  pub avatar_ref:           Option<String>,
  pub is_private:           bool,
  pub is_verified:          bool,
  pub role:                 Role,
  /// `None` means the username has never been changed.
  pub last_username_change: Option<DateTime<Utc>>,
  pub created_at:           DateTime<Utc>,
}

impl Profile {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// Earliest instant at which a username change is allowed, or `None` if it
  /// is allowed right away.
  pub fn username_change_eligible_at(&self, cooldown: Duration) -> Option<DateTime<Utc>> {
    self.last_username_change.map(|at| at + cooldown)
  }

  pub fn summary(&self) -> ProfileSummary {
    ProfileSummary {
      id:           self.id,
      username:     self.username.clone(),
      display_name: self.display_name.clone(),
      avatar_ref:   self.avatar_ref.clone(),
      is_verified:  self.is_verified,
    }
  }
}

/// The slice of a profile rendered next to content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
  pub id:           Id,
  pub username:     String,
  pub display_name: String,
  pub avatar_ref:   Option<String>,
  pub is_verified:  bool,
}

/// Input to [`crate::store::SocialStore::create_profile`].
#[derive(Debug, Clone)]
pub struct NewProfile {
  pub id:           Id,
  pub username:     String,
  pub display_name: String,
}

/// Owner-editable profile fields. `None` leaves a field untouched; the inner
/// `Option` on nullable fields distinguishes "clear" from "keep".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
  pub display_name: Option<String>,
  #[serde(default, with = "double_option")]
  pub bio:          Option<Option<String>>,
  #[serde(default, with = "double_option")]
  pub avatar_ref:   Option<Option<String>>,
  pub is_private:   Option<bool>,
}

impl ProfilePatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.display_name {
      validate_display_name(name)?;
    }
    if let Some(Some(bio)) = &self.bio {
      if bio.chars().count() > BIO_MAX_LEN {
        return Err(Error::Validation(format!("bio exceeds {BIO_MAX_LEN} characters")));
      }
    }
    Ok(())
  }
}

mod double_option {
  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
  where
    D: Deserializer<'de>,
  {
    Option::<String>::deserialize(d).map(Some)
  }
}

/// Profile page payload: the profile plus graph counts as seen by a viewer.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
  pub profile:         Profile,
  pub followers:       u64,
  pub following:       u64,
  pub posts:           u64,
  pub viewer_follows:  bool,
  /// Whether the viewer may see this profile's posts and stories.
  pub content_visible: bool,
}

/// Admin dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
  pub profiles:              u64,
  pub posts:                 u64,
  pub pending_verifications: u64,
}

pub fn validate_username(raw: &str) -> Result<String> {
  let name = raw.trim();
  let len = name.chars().count();
  if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
    return Err(Error::Validation(format!(
      "username must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters"
    )));
  }
  if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
    return Err(Error::Validation(
      "username may only contain letters, digits, '_' and '.'".into(),
    ));
  }
  Ok(name.to_owned())
}

pub fn validate_display_name(raw: &str) -> Result<String> {
  let name = raw.trim();
  if name.is_empty() {
    return Err(Error::Validation("display name must not be empty".into()));
  }
  if name.chars().count() > DISPLAY_NAME_MAX_LEN {
    return Err(Error::Validation(format!(
      "display name exceeds {DISPLAY_NAME_MAX_LEN} characters"
    )));
  }
  Ok(name.to_owned())
}
