//! Profile Registry.
//!
//! Username uniqueness is enforced by the store's unique index, never by a
//! lookup-then-insert here.

use agora_core::{
  Error, Id, Result,
  clock::Clock,
  profile::{
    NewProfile, Profile, ProfilePatch, ProfileView, Stats, validate_display_name,
    validate_username,
  },
  store::{ProfileInsert, SocialStore, UsernameChange},
};

use crate::{Access, Engine};

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  /// Create the profile for a freshly authenticated identity. Calling this
  /// again for the same id returns the stored profile untouched.
  pub async fn ensure_profile(&self, id: Id, username: &str, display_name: &str) -> Result<Profile> {
    let input = NewProfile {
      id,
      username: validate_username(username)?,
      display_name: validate_display_name(display_name)?,
    };
    match self.store.create_profile(input, self.now()).await.map_err(Error::store)? {
      ProfileInsert::Created(p) | ProfileInsert::Existing(p) => Ok(p),
      ProfileInsert::UsernameTaken => Err(Error::Conflict(format!("username {username} is taken"))),
    }
  }

  pub async fn update_profile(&self, viewer: Id, patch: ProfilePatch) -> Result<Profile> {
    patch.validate()?;
    let patch = ProfilePatch {
      display_name: patch.display_name.as_deref().map(validate_display_name).transpose()?,
      bio:          patch.bio.map(blank_to_none),
      avatar_ref:   patch.avatar_ref.map(blank_to_none),
      is_private:   patch.is_private,
    };
    self
      .store
      .update_profile(viewer, patch)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("profile {viewer}")))
  }

  /// Rename, at most once per cooldown. The first change is always allowed.
  pub async fn change_username(&self, viewer: Id, username: &str) -> Result<Profile> {
    let username = validate_username(username)?;
    let cooldown = self.config.username_cooldown();
    let outcome = self
      .store
      .change_username(viewer, username.clone(), self.now(), cooldown)
      .await
      .map_err(Error::store)?;
    match outcome {
      UsernameChange::Changed(p) => Ok(p),
      UsernameChange::Taken => Err(Error::Conflict(format!("username {username} is taken"))),
      UsernameChange::CoolingDown { eligible_at } => Err(Error::Conflict(format!(
        "username can be changed again after {}",
        eligible_at.to_rfc3339()
      ))),
      UsernameChange::ProfileNotFound => Err(Error::NotFound(format!("profile {viewer}"))),
    }
  }

  pub async fn get_profile(&self, viewer: Option<Id>, id: Id) -> Result<ProfileView> {
    let profile = self.require_profile(id).await?;
    self.profile_view(viewer, profile).await
  }

  pub async fn get_profile_by_username(
    &self,
    viewer: Option<Id>,
    username: &str,
  ) -> Result<ProfileView> {
    let profile = self
      .store
      .get_profile_by_username(username)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("@{username}")))?;
    self.profile_view(viewer, profile).await
  }

  async fn profile_view(&self, viewer: Option<Id>, profile: Profile) -> Result<ProfileView> {
    let content_visible = match self.access(viewer, &profile).await? {
      Access::Blocked => return Err(Error::NotFound(format!("profile {}", profile.id))),
      Access::Private => false,
      Access::Visible => true,
    };
    let counts = self.store.profile_counts(profile.id).await.map_err(Error::store)?;
    let viewer_follows = match viewer {
      Some(v) if v != profile.id => {
        self.store.is_following(v, profile.id).await.map_err(Error::store)?
      }
      _ => false,
    };
    Ok(ProfileView {
      profile,
      followers: counts.followers,
      following: counts.following,
      posts: counts.posts,
      viewer_follows,
      content_visible,
    })
  }

  pub async fn admin_stats(&self, admin: Id) -> Result<Stats> {
    self.require_admin(admin).await?;
    self.store.stats().await.map_err(Error::store)
  }
}

/// Setting a nullable field to blank text clears it.
fn blank_to_none(value: Option<String>) -> Option<String> {
  value.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}
