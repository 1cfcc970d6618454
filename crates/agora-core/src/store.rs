//! The `SocialStore` trait and supporting query/outcome types.
//!
//! The trait is implemented by storage backends (e.g. `agora-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.
//!
//! Expected business outcomes (a taken username, an outstanding verification
//! request, deleting someone else's post) are reported through the outcome
//! enums below rather than through `Self::Error`, which is reserved for
//! infrastructure failures. Every multi-step write is atomic in the backend.

use std::{
  collections::{HashMap, HashSet},
  future::Future,
  time::Duration as StdDuration,
};

use chrono::{DateTime, Duration, Utc};

use crate::{
  Id,
  content::{Comment, NewComment, NewPost, NewStory, Post, Story},
  cursor::{Cursor, PageRequest},
  engagement::LikeState,
  notification::{NewNotification, Notification},
  profile::{NewProfile, Profile, ProfilePatch, Role, Stats},
  ratelimit::RateDecision,
  verification::{Decision, NewVerification, VerificationRequest, VerificationStatus},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`SocialStore::find_posts`]. Results are always ordered by
/// `(created_at, id)` descending.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
  /// Restrict to these authors. `Some(vec![])` matches nothing.
  pub authors:         Option<Vec<Id>>,
  /// Never return posts by these authors.
  pub exclude_authors: Vec<Id>,
  /// Case-insensitive substring filter over the body.
  pub text:            Option<String>,
  /// Only posts created at or after this instant.
  pub since:           Option<DateTime<Utc>>,
  /// Keyset position: only posts strictly after this cursor.
  pub after:           Option<Cursor>,
  /// When set, hide posts by private authors unless the viewer is the author
  /// or follows them. `viewer: None` then means "public posts only".
  pub enforce_privacy: bool,
  pub viewer:          Option<Id>,
  pub limit:           usize,
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum ProfileInsert {
  Created(Profile),
  /// A profile with this id already exists; it is returned unchanged.
  Existing(Profile),
  UsernameTaken,
}

#[derive(Debug, Clone)]
pub enum UsernameChange {
  Changed(Profile),
  /// Another profile holds this username (case-insensitively).
  Taken,
  CoolingDown { eligible_at: DateTime<Utc> },
  ProfileNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
  Deleted,
  NotFound,
  NotOwner,
}

#[derive(Debug, Clone)]
pub enum NotificationInsert {
  Inserted(Notification),
  /// An identical notification exists inside the suppression window.
  Suppressed,
}

#[derive(Debug, Clone)]
pub enum VerificationInsert {
  Created(VerificationRequest),
  PendingExists,
  AlreadyVerified,
  ProfileNotFound,
}

#[derive(Debug, Clone)]
pub enum VerificationDecision {
  Decided(VerificationRequest),
  NotFound,
  AlreadyDecided(VerificationStatus),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileCounts {
  pub followers: u64,
  pub following: u64,
  pub posts:     u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Agora storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`). Timestamps are always supplied by
/// the caller.
pub trait SocialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Insert a profile unless one with the same id exists. Username uniqueness
  /// is enforced by the storage layer, not by a prior lookup.
  fn create_profile(
    &self,
    input: NewProfile,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<ProfileInsert, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Case-insensitive lookup.
  fn get_profile_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// Fetch many profiles at once; missing ids are simply absent.
  fn profiles_by_ids<'a>(
    &'a self,
    ids: &'a [Id],
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + 'a;

  /// Apply owner-editable changes. Returns `None` if the profile is missing.
  fn update_profile(
    &self,
    id: Id,
    patch: ProfilePatch,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Atomically check the cooldown and claim the new username.
  fn change_username(
    &self,
    id: Id,
    username: String,
    now: DateTime<Utc>,
    cooldown: Duration,
  ) -> impl Future<Output = Result<UsernameChange, Self::Error>> + Send + '_;

  /// Returns `false` if the profile does not exist.
  fn set_role(
    &self,
    id: Id,
    role: Role,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Substring match over username and display name. Private profiles are
  /// only included when `viewer` is them or follows them.
  fn search_profiles<'a>(
    &'a self,
    text: &'a str,
    viewer: Option<Id>,
    exclude: &'a [Id],
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + 'a;

  fn profile_counts(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<ProfileCounts, Self::Error>> + Send + '_;

  fn stats(&self) -> impl Future<Output = Result<Stats, Self::Error>> + Send + '_;

  // ── Recommendations ───────────────────────────────────────────────────

  /// Idempotent. Returns `true` if `user_id` was not recommended before.
  fn add_recommended_user(
    &self,
    user_id: Id,
    added_by: Id,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `true` if a recommendation was removed.
  fn remove_recommended_user(
    &self,
    user_id: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Recommended profiles newest first, minus `viewer` itself, everyone
  /// `viewer` already follows and every block relation of `viewer`.
  fn recommended_users(
    &self,
    viewer: Id,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  // ── Social graph ──────────────────────────────────────────────────────

  /// Idempotent. Returns `true` if a new edge was created.
  fn follow(
    &self,
    follower: Id,
    followee: Id,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Idempotent. Returns `true` if an edge was removed.
  fn unfollow(
    &self,
    follower: Id,
    followee: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn is_following(
    &self,
    follower: Id,
    followee: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn followees(
    &self,
    user: Id,
  ) -> impl Future<Output = Result<Vec<Id>, Self::Error>> + Send + '_;

  fn followers(
    &self,
    user: Id,
  ) -> impl Future<Output = Result<Vec<Id>, Self::Error>> + Send + '_;

  /// Idempotent. Does not touch follow edges.
  fn block(
    &self,
    blocker: Id,
    blocked: Id,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn unblock(
    &self,
    blocker: Id,
    blocked: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn is_blocked(
    &self,
    blocker: Id,
    blocked: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Every user with a block edge to or from `user`.
  fn block_relations(
    &self,
    user: Id,
  ) -> impl Future<Output = Result<Vec<Id>, Self::Error>> + Send + '_;

  // ── Posts & comments ──────────────────────────────────────────────────

  fn insert_post(
    &self,
    input: NewPost,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  fn get_post(&self, id: Id)
  -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Delete a post owned by `requester`, cascading to its comments, likes
  /// and notifications.
  fn delete_post(
    &self,
    id: Id,
    requester: Id,
  ) -> impl Future<Output = Result<Deletion, Self::Error>> + Send + '_;

  fn find_posts<'a>(
    &'a self,
    query: &'a PostQuery,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + 'a;

  /// Returns `None` if the post does not exist (checked in the same
  /// transaction as the insert).
  fn insert_comment(
    &self,
    input: NewComment,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// Oldest first; `page.cursor` is the last comment already seen.
  fn comments_for_post(
    &self,
    post_id: Id,
    page: PageRequest,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  // ── Engagement ────────────────────────────────────────────────────────

  /// Idempotently set the like state. Returns `None` if the post is missing.
  fn set_like(
    &self,
    post_id: Id,
    user_id: Id,
    liked: bool,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<LikeState>, Self::Error>> + Send + '_;

  /// Flip the like state atomically. Returns `None` if the post is missing.
  fn toggle_like(
    &self,
    post_id: Id,
    user_id: Id,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<LikeState>, Self::Error>> + Send + '_;

  /// One grouped query over the whole id set. Posts without likes are absent.
  fn like_counts<'a>(
    &'a self,
    post_ids: &'a [Id],
  ) -> impl Future<Output = Result<HashMap<Id, u64>, Self::Error>> + Send + 'a;

  /// One grouped query over the whole id set. Posts without comments are
  /// absent.
  fn comment_counts<'a>(
    &'a self,
    post_ids: &'a [Id],
  ) -> impl Future<Output = Result<HashMap<Id, u64>, Self::Error>> + Send + 'a;

  /// The subset of `post_ids` liked by `user_id`, in a single membership query.
  fn liked_posts<'a>(
    &'a self,
    user_id: Id,
    post_ids: &'a [Id],
  ) -> impl Future<Output = Result<HashSet<Id>, Self::Error>> + Send + 'a;

  // ── Stories ───────────────────────────────────────────────────────────

  /// `expires_at` is derived from `now` and fixed forever.
  fn insert_story(
    &self,
    input: NewStory,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Story, Self::Error>> + Send + '_;

  /// Stories by `authors` visible at `now`, newest first.
  fn visible_stories<'a>(
    &'a self,
    authors: &'a [Id],
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Story>, Self::Error>> + Send + 'a;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Insert unless an identical (recipient, actor, type, post) notification
  /// was created at or after `suppress_since`. Check and insert are atomic.
  fn insert_notification(
    &self,
    input: NewNotification,
    now: DateTime<Utc>,
    suppress_since: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<NotificationInsert, Self::Error>> + Send + '_;

  /// Newest first.
  fn notifications_for(
    &self,
    recipient: Id,
    page: PageRequest,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Returns `false` if no such notification belongs to `recipient`.
  fn mark_notification_read(
    &self,
    recipient: Id,
    id: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn mark_all_notifications_read(
    &self,
    recipient: Id,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn unread_notifications(
    &self,
    recipient: Id,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Rate limiting ─────────────────────────────────────────────────────

  /// Per-action cooldown gate. If the last allowed action of this kind is
  /// younger than `window`, deny; otherwise record `now` and allow.
  fn rate_limit<'a>(
    &'a self,
    user_id: Id,
    action: &'a str,
    window: StdDuration,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<RateDecision, Self::Error>> + Send + 'a;

  // ── Verification ──────────────────────────────────────────────────────

  /// At most one pending request per profile, enforced by the storage layer.
  fn insert_verification(
    &self,
    input: NewVerification,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<VerificationInsert, Self::Error>> + Send + '_;

  fn get_verification(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<VerificationRequest>, Self::Error>> + Send + '_;

  /// The most recent request submitted by `user_id`, whatever its state.
  fn latest_verification(
    &self,
    user_id: Id,
  ) -> impl Future<Output = Result<Option<VerificationRequest>, Self::Error>> + Send + '_;

  /// Newest first.
  fn pending_verifications(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<VerificationRequest>, Self::Error>> + Send + '_;

  /// Transition a pending request to its terminal state. Approval marks the
  /// profile verified in the same transaction.
  fn decide_verification(
    &self,
    id: Id,
    admin: Id,
    decision: Decision,
    notes: Option<String>,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<VerificationDecision, Self::Error>> + Send + '_;
}
