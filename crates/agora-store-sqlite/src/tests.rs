//! Integration tests for `SqliteStore` against an in-memory database.

use std::{collections::BTreeMap, time::Duration as StdDuration};

use agora_core::{
  Id,
  content::{NewComment, NewPost, NewStory},
  cursor::{Cursor, PageRequest},
  notification::{NewNotification, NotificationKind},
  profile::{NewProfile, ProfilePatch, Role},
  ratelimit::RateDecision,
  store::{
    Deletion, NotificationInsert, PostQuery, ProfileInsert, SocialStore, UsernameChange,
    VerificationDecision, VerificationInsert,
  },
  verification::{Decision, NewVerification, VerificationStatus},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() }

async fn profile(s: &SqliteStore, username: &str) -> Id {
  let id = Uuid::new_v4();
  let input = NewProfile { id, username: username.into(), display_name: username.into() };
  match s.create_profile(input, t0()).await.unwrap() {
    ProfileInsert::Created(p) => p.id,
    other => panic!("expected created profile, got {other:?}"),
  }
}

async fn post(s: &SqliteStore, author: Id, body: &str, at: DateTime<Utc>) -> Id {
  s.insert_post(NewPost::new(author, body, None).unwrap(), at).await.unwrap().id
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_profile_is_idempotent_per_id() {
  let s = store().await;
  let id = Uuid::new_v4();
  let input = NewProfile { id, username: "alice".into(), display_name: "Alice".into() };

  assert!(matches!(
    s.create_profile(input.clone(), t0()).await.unwrap(),
    ProfileInsert::Created(_)
  ));
  match s.create_profile(input, t0() + Duration::hours(1)).await.unwrap() {
    ProfileInsert::Existing(p) => assert_eq!(p.created_at, t0()),
    other => panic!("expected existing profile, got {other:?}"),
  }
}

#[tokio::test]
async fn usernames_are_unique_case_insensitively() {
  let s = store().await;
  profile(&s, "alice").await;

  let input =
    NewProfile { id: Uuid::new_v4(), username: "ALICE".into(), display_name: "Imposter".into() };
  assert!(matches!(
    s.create_profile(input, t0()).await.unwrap(),
    ProfileInsert::UsernameTaken
  ));

  let found = s.get_profile_by_username("Alice").await.unwrap().unwrap();
  assert_eq!(found.username, "alice");
}

#[tokio::test]
async fn username_change_respects_cooldown_and_uniqueness() {
  let s = store().await;
  let alice = profile(&s, "alice").await;
  profile(&s, "bob").await;
  let cooldown = Duration::days(14);

  let taken = s.change_username(alice, "Bob".into(), t0(), cooldown).await.unwrap();
  assert!(matches!(taken, UsernameChange::Taken));

  let first = s.change_username(alice, "alicia".into(), t0(), cooldown).await.unwrap();
  match first {
    UsernameChange::Changed(p) => {
      assert_eq!(p.username, "alicia");
      assert_eq!(p.last_username_change, Some(t0()));
    }
    other => panic!("expected change, got {other:?}"),
  }

  let early = t0() + Duration::days(13);
  match s.change_username(alice, "ali".into(), early, cooldown).await.unwrap() {
    UsernameChange::CoolingDown { eligible_at } => assert_eq!(eligible_at, t0() + cooldown),
    other => panic!("expected cooldown, got {other:?}"),
  }

  let on_time = t0() + cooldown;
  assert!(matches!(
    s.change_username(alice, "ali".into(), on_time, cooldown).await.unwrap(),
    UsernameChange::Changed(_)
  ));

  assert!(matches!(
    s.change_username(Uuid::new_v4(), "ghost".into(), on_time, cooldown).await.unwrap(),
    UsernameChange::ProfileNotFound
  ));
}

#[tokio::test]
async fn update_profile_distinguishes_clear_from_keep() {
  let s = store().await;
  let alice = profile(&s, "alice").await;

  let set = ProfilePatch {
    bio: Some(Some("hello".into())),
    avatar_ref: Some(Some("img/1".into())),
    ..Default::default()
  };
  let p = s.update_profile(alice, set).await.unwrap().unwrap();
  assert_eq!(p.bio.as_deref(), Some("hello"));

  let keep_bio_clear_avatar = ProfilePatch {
    avatar_ref: Some(None),
    is_private: Some(true),
    ..Default::default()
  };
  let p = s.update_profile(alice, keep_bio_clear_avatar).await.unwrap().unwrap();
  assert_eq!(p.bio.as_deref(), Some("hello"));
  assert_eq!(p.avatar_ref, None);
  assert!(p.is_private);
  assert_eq!(p.display_name, "alice");

  assert!(s.update_profile(Uuid::new_v4(), ProfilePatch::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn set_role_and_stats() {
  let s = store().await;
  let alice = profile(&s, "alice").await;
  post(&s, alice, "hi", t0()).await;

  assert!(s.set_role(alice, Role::Admin).await.unwrap());
  assert!(s.get_profile(alice).await.unwrap().unwrap().is_admin());
  assert!(!s.set_role(Uuid::new_v4(), Role::Admin).await.unwrap());

  let stats = s.stats().await.unwrap();
  assert_eq!(stats.profiles, 1);
  assert_eq!(stats.posts, 1);
  assert_eq!(stats.pending_verifications, 0);
}

#[tokio::test]
async fn search_profiles_hides_private_strangers() {
  let s = store().await;
  let viewer = profile(&s, "viewer").await;
  profile(&s, "ann_public").await;
  let hidden = profile(&s, "ann_private").await;
  s.update_profile(hidden, ProfilePatch { is_private: Some(true), ..Default::default() })
    .await
    .unwrap();

  let found = s.search_profiles("ann", Some(viewer), &[], 10).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].username, "ann_public");

  s.follow(viewer, hidden, t0()).await.unwrap();
  let found = s.search_profiles("ann", Some(viewer), &[], 10).await.unwrap();
  assert_eq!(found.len(), 2);

  // `_` is literal, not a wildcard.
  let found = s.search_profiles("n_p", Some(viewer), &[], 10).await.unwrap();
  assert_eq!(found.len(), 2);
  let found = s.search_profiles("n_x", Some(viewer), &[], 10).await.unwrap();
  assert!(found.is_empty());
}

#[tokio::test]
async fn search_profiles_folds_non_ascii_case() {
  let s = store().await;
  let input =
    NewProfile { id: Uuid::new_v4(), username: "emile".into(), display_name: "ÉMILE Zürcher".into() };
  s.create_profile(input, t0()).await.unwrap();

  for query in ["émile", "ZÜRCHER", "zürch"] {
    let found = s.search_profiles(query, None, &[], 10).await.unwrap();
    assert_eq!(found.len(), 1, "query {query:?}");
    assert_eq!(found[0].username, "emile");
  }
}

// ─── Social graph ────────────────────────────────────────────────────────────

#[tokio::test]
async fn follow_twice_keeps_one_edge() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let b = profile(&s, "bob").await;

  assert!(s.follow(a, b, t0()).await.unwrap());
  assert!(!s.follow(a, b, t0()).await.unwrap());
  assert_eq!(s.followers(b).await.unwrap(), vec![a]);
  assert_eq!(s.profile_counts(b).await.unwrap().followers, 1);
  assert_eq!(s.profile_counts(a).await.unwrap().following, 1);

  assert!(s.unfollow(a, b).await.unwrap());
  assert!(!s.unfollow(a, b).await.unwrap());
  assert!(!s.is_following(a, b).await.unwrap());
}

#[tokio::test]
async fn block_relations_are_symmetric() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let b = profile(&s, "bob").await;
  let c = profile(&s, "carol").await;

  s.block(a, b, t0()).await.unwrap();
  s.block(c, a, t0()).await.unwrap();

  let mut related = s.block_relations(a).await.unwrap();
  related.sort();
  let mut expected = vec![b, c];
  expected.sort();
  assert_eq!(related, expected);
  assert!(s.is_blocked(a, b).await.unwrap());
  assert!(!s.is_blocked(b, a).await.unwrap());
}

// ─── Recommendations ─────────────────────────────────────────────────────────

#[tokio::test]
async fn recommended_users_skip_self_followees_and_blocks() {
  let s = store().await;
  let admin = profile(&s, "admin").await;
  let viewer = profile(&s, "viewer").await;
  let followed = profile(&s, "followed").await;
  let blocker = profile(&s, "blocker").await;
  let fresh = profile(&s, "fresh").await;
  let older = profile(&s, "older").await;

  assert!(s.add_recommended_user(older, admin, t0()).await.unwrap());
  for (i, id) in [viewer, followed, blocker, fresh].into_iter().enumerate() {
    let at = t0() + Duration::minutes(i as i64 + 1);
    assert!(s.add_recommended_user(id, admin, at).await.unwrap());
  }
  assert!(!s.add_recommended_user(fresh, admin, t0()).await.unwrap());

  s.follow(viewer, followed, t0()).await.unwrap();
  s.block(blocker, viewer, t0()).await.unwrap();

  let ids: Vec<Id> =
    s.recommended_users(viewer, 10).await.unwrap().into_iter().map(|p| p.id).collect();
  assert_eq!(ids, vec![fresh, older]);
  assert_eq!(s.recommended_users(viewer, 1).await.unwrap().len(), 1);

  assert!(s.remove_recommended_user(fresh).await.unwrap());
  assert!(!s.remove_recommended_user(fresh).await.unwrap());
  let ids: Vec<Id> =
    s.recommended_users(viewer, 10).await.unwrap().into_iter().map(|p| p.id).collect();
  assert_eq!(ids, vec![older]);
}

// ─── Posts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_posts_pages_by_keyset() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  for i in 0..5 {
    post(&s, a, &format!("post {i}"), t0() + Duration::minutes(i)).await;
  }
  // Two posts share a timestamp; the id breaks the tie.
  post(&s, a, "twin", t0() + Duration::minutes(4)).await;

  let mut query = PostQuery { authors: Some(vec![a]), limit: 4, ..Default::default() };
  let first = s.find_posts(&query).await.unwrap();
  assert_eq!(first.len(), 4);

  let last = first.last().unwrap();
  query.after = Some(Cursor::new(last.created_at, last.id));
  let second = s.find_posts(&query).await.unwrap();
  assert_eq!(second.len(), 2);

  let mut seen: Vec<Id> = first.iter().chain(&second).map(|p| p.id).collect();
  seen.sort();
  seen.dedup();
  assert_eq!(seen.len(), 6);

  let all: Vec<_> = first.iter().chain(&second).collect();
  assert!(all.windows(2).all(|w| (w[0].created_at, w[0].id) > (w[1].created_at, w[1].id)));
}

#[tokio::test]
async fn find_posts_enforces_privacy() {
  let s = store().await;
  let viewer = profile(&s, "viewer").await;
  let secret = profile(&s, "secret").await;
  s.update_profile(secret, ProfilePatch { is_private: Some(true), ..Default::default() })
    .await
    .unwrap();
  post(&s, secret, "hidden", t0()).await;

  let mut query = PostQuery {
    enforce_privacy: true,
    viewer: Some(viewer),
    limit: 10,
    ..Default::default()
  };
  assert!(s.find_posts(&query).await.unwrap().is_empty());

  s.follow(viewer, secret, t0()).await.unwrap();
  assert_eq!(s.find_posts(&query).await.unwrap().len(), 1);

  query.viewer = None;
  assert!(s.find_posts(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn find_posts_text_filter_folds_non_ascii_case() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  post(&s, a, "Café ÉTÉ in Zürich", t0()).await;
  post(&s, a, "plain ascii", t0()).await;

  for needle in ["été", "ZÜRICH", "café"] {
    let query = PostQuery { text: Some(needle.into()), limit: 10, ..Default::default() };
    let found = s.find_posts(&query).await.unwrap();
    assert_eq!(found.len(), 1, "needle {needle:?}");
    assert_eq!(found[0].body, "Café ÉTÉ in Zürich");
  }
}

#[tokio::test]
async fn delete_post_cascades() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let b = profile(&s, "bob").await;
  let p = post(&s, a, "doomed", t0()).await;

  s.insert_comment(NewComment::new(p, b, "nice").unwrap(), t0()).await.unwrap().unwrap();
  s.set_like(p, b, true, t0()).await.unwrap();
  let note = NewNotification::between(b, a, NotificationKind::Like { post_id: p }).unwrap();
  s.insert_notification(note, t0(), None).await.unwrap();

  assert_eq!(s.delete_post(p, b).await.unwrap(), Deletion::NotOwner);
  assert_eq!(s.delete_post(p, a).await.unwrap(), Deletion::Deleted);
  assert_eq!(s.delete_post(p, a).await.unwrap(), Deletion::NotFound);

  assert!(s.get_post(p).await.unwrap().is_none());
  assert!(s.like_counts(&[p]).await.unwrap().is_empty());
  assert!(s.comment_counts(&[p]).await.unwrap().is_empty());
  assert_eq!(s.unread_notifications(a).await.unwrap(), 0);
}

#[tokio::test]
async fn comments_page_oldest_first() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let p = post(&s, a, "thread", t0()).await;
  for i in 0..3 {
    let c = NewComment::new(p, a, &format!("c{i}")).unwrap();
    s.insert_comment(c, t0() + Duration::seconds(i)).await.unwrap();
  }

  let first = s.comments_for_post(p, PageRequest::first(2)).await.unwrap();
  assert_eq!(first.iter().map(|c| c.body.as_str()).collect::<Vec<_>>(), ["c0", "c1"]);

  let last = first.last().unwrap();
  let next = PageRequest { cursor: Some(Cursor::new(last.created_at, last.id)), limit: 2 };
  let second = s.comments_for_post(p, next).await.unwrap();
  assert_eq!(second.len(), 1);
  assert_eq!(second[0].body, "c2");

  let orphan = NewComment::new(Uuid::new_v4(), a, "lost").unwrap();
  assert!(s.insert_comment(orphan, t0()).await.unwrap().is_none());
}

// ─── Engagement ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn likes_are_idempotent_and_never_negative() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let p = post(&s, a, "likeable", t0()).await;

  let first = s.set_like(p, a, true, t0()).await.unwrap().unwrap();
  assert!(first.changed);
  assert_eq!(first.like_count, 1);

  let again = s.set_like(p, a, true, t0()).await.unwrap().unwrap();
  assert!(!again.changed);
  assert_eq!(again.like_count, 1);

  let unliked = s.set_like(p, a, false, t0()).await.unwrap().unwrap();
  assert_eq!(unliked.like_count, 0);
  let unliked = s.set_like(p, a, false, t0()).await.unwrap().unwrap();
  assert!(!unliked.changed);
  assert_eq!(unliked.like_count, 0);

  assert!(s.set_like(Uuid::new_v4(), a, true, t0()).await.unwrap().is_none());
}

#[tokio::test]
async fn toggle_like_flips_state() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let p = post(&s, a, "toggle", t0()).await;

  let on = s.toggle_like(p, a, t0()).await.unwrap().unwrap();
  assert!(on.liked);
  assert_eq!(on.like_count, 1);
  let off = s.toggle_like(p, a, t0()).await.unwrap().unwrap();
  assert!(!off.liked);
  assert_eq!(off.like_count, 0);
}

#[tokio::test]
async fn batch_counts_match_individual_counts() {
  let s = store().await;
  let users = [profile(&s, "u1").await, profile(&s, "u2").await, profile(&s, "u3").await];
  let p1 = post(&s, users[0], "one", t0()).await;
  let p2 = post(&s, users[0], "two", t0()).await;
  let p3 = post(&s, users[0], "three", t0()).await;
  let missing = Uuid::new_v4();

  for u in users {
    s.set_like(p1, u, true, t0()).await.unwrap();
  }
  s.set_like(p2, users[1], true, t0()).await.unwrap();
  s.insert_comment(NewComment::new(p2, users[2], "hey").unwrap(), t0()).await.unwrap();

  let ids = [p1, p2, p3, missing];
  let likes = s.like_counts(&ids).await.unwrap();
  let comments = s.comment_counts(&ids).await.unwrap();
  for id in ids {
    let single_likes = s.like_counts(&[id]).await.unwrap();
    assert_eq!(likes.get(&id), single_likes.get(&id));
    let single_comments = s.comment_counts(&[id]).await.unwrap();
    assert_eq!(comments.get(&id), single_comments.get(&id));
  }
  assert_eq!(likes.get(&p1), Some(&3));
  assert_eq!(likes.get(&p3), None);
  assert_eq!(comments.get(&p2), Some(&1));

  let liked = s.liked_posts(users[1], &ids).await.unwrap();
  assert!(liked.contains(&p1) && liked.contains(&p2));
  assert_eq!(liked.len(), 2);
  assert!(s.like_counts(&[]).await.unwrap().is_empty());
}

// ─── Stories ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stories_are_visible_for_a_day() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let story = s
    .insert_story(NewStory::new(a, Some("sunset"), None).unwrap(), t0())
    .await
    .unwrap();
  assert_eq!(story.expires_at, t0() + Duration::hours(24));

  let almost = t0() + Duration::hours(23) + Duration::minutes(59);
  assert_eq!(s.visible_stories(&[a], almost).await.unwrap().len(), 1);

  let after = t0() + Duration::hours(24) + Duration::minutes(1);
  assert!(s.visible_stories(&[a], after).await.unwrap().is_empty());
  assert!(s.visible_stories(&[a], t0() - Duration::seconds(1)).await.unwrap().is_empty());
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn notifications_are_suppressed_inside_the_window() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let b = profile(&s, "bob").await;
  let kind = NotificationKind::Follow;
  let window = Duration::minutes(10);

  let first = s
    .insert_notification(NewNotification::between(b, a, kind).unwrap(), t0(), Some(t0() - window))
    .await
    .unwrap();
  assert!(matches!(first, NotificationInsert::Inserted(_)));

  let soon = t0() + Duration::minutes(5);
  let dup = s
    .insert_notification(NewNotification::between(b, a, kind).unwrap(), soon, Some(soon - window))
    .await
    .unwrap();
  assert!(matches!(dup, NotificationInsert::Suppressed));

  let later = t0() + Duration::minutes(11);
  let fresh = s
    .insert_notification(NewNotification::between(b, a, kind).unwrap(), later, Some(later - window))
    .await
    .unwrap();
  assert!(matches!(fresh, NotificationInsert::Inserted(_)));
  assert_eq!(s.unread_notifications(a).await.unwrap(), 2);
}

#[tokio::test]
async fn notifications_mark_read() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let b = profile(&s, "bob").await;
  let p = post(&s, a, "hello", t0()).await;

  for (i, kind) in [NotificationKind::Follow, NotificationKind::Comment { post_id: p }]
    .into_iter()
    .enumerate()
  {
    let at = t0() + Duration::seconds(i as i64);
    s.insert_notification(NewNotification::between(b, a, kind).unwrap(), at, None)
      .await
      .unwrap();
  }

  let page = s.notifications_for(a, PageRequest::first(10)).await.unwrap();
  assert_eq!(page.len(), 2);
  assert_eq!(page[0].kind, NotificationKind::Comment { post_id: p });

  assert!(s.mark_notification_read(a, page[0].id).await.unwrap());
  assert!(!s.mark_notification_read(b, page[1].id).await.unwrap());
  assert_eq!(s.unread_notifications(a).await.unwrap(), 1);
  assert_eq!(s.mark_all_notifications_read(a).await.unwrap(), 1);
  assert_eq!(s.unread_notifications(a).await.unwrap(), 0);
}

// ─── Rate limiting ───────────────────────────────────────────────────────────

#[tokio::test]
async fn rate_limit_window_boundaries() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let window = StdDuration::from_secs(60);

  assert_eq!(s.rate_limit(a, "post", window, t0()).await.unwrap(), RateDecision::Allowed);

  let denied = s.rate_limit(a, "post", window, t0() + Duration::seconds(30)).await.unwrap();
  assert_eq!(denied, RateDecision::Denied { retry_after: StdDuration::from_secs(30) });

  // Other actions are tracked separately.
  assert!(s.rate_limit(a, "comment", window, t0()).await.unwrap().is_allowed());

  // A denied attempt does not extend the window.
  let exact = t0() + Duration::seconds(60);
  assert!(s.rate_limit(a, "post", window, exact).await.unwrap().is_allowed());
}

// ─── Verification ────────────────────────────────────────────────────────────

fn request(user: Id) -> NewVerification {
  let links = BTreeMap::from([("github".to_owned(), "https://github.com/someone".to_owned())]);
  NewVerification::new(user, "I build things", links).unwrap()
}

#[tokio::test]
async fn one_pending_request_per_profile() {
  let s = store().await;
  let a = profile(&s, "alice").await;

  let created = match s.insert_verification(request(a), t0()).await.unwrap() {
    VerificationInsert::Created(r) => r,
    other => panic!("expected created request, got {other:?}"),
  };
  assert!(matches!(
    s.insert_verification(request(a), t0()).await.unwrap(),
    VerificationInsert::PendingExists
  ));
  assert!(matches!(
    s.insert_verification(request(Uuid::new_v4()), t0()).await.unwrap(),
    VerificationInsert::ProfileNotFound
  ));

  let fetched = s.get_verification(created.id).await.unwrap().unwrap();
  assert_eq!(fetched.social_links, created.social_links);
  assert_eq!(s.pending_verifications(10).await.unwrap().len(), 1);
  assert_eq!(s.stats().await.unwrap().pending_verifications, 1);
}

#[tokio::test]
async fn approval_verifies_profile_once() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let admin = profile(&s, "admin").await;
  let VerificationInsert::Created(req) = s.insert_verification(request(a), t0()).await.unwrap()
  else {
    panic!("expected created request");
  };

  let decided = s
    .decide_verification(req.id, admin, Decision::Approve, Some("ok".into()), t0())
    .await
    .unwrap();
  match decided {
    VerificationDecision::Decided(r) => {
      assert_eq!(r.status, VerificationStatus::Approved);
      assert_eq!(r.decided_by, Some(admin));
      assert_eq!(r.admin_notes.as_deref(), Some("ok"));
    }
    other => panic!("expected decision, got {other:?}"),
  }
  assert!(s.get_profile(a).await.unwrap().unwrap().is_verified);

  assert!(matches!(
    s.decide_verification(req.id, admin, Decision::Reject, None, t0()).await.unwrap(),
    VerificationDecision::AlreadyDecided(VerificationStatus::Approved)
  ));
  assert!(matches!(
    s.insert_verification(request(a), t0()).await.unwrap(),
    VerificationInsert::AlreadyVerified
  ));
  assert!(matches!(
    s.decide_verification(Uuid::new_v4(), admin, Decision::Approve, None, t0()).await.unwrap(),
    VerificationDecision::NotFound
  ));
}

#[tokio::test]
async fn rejection_allows_resubmission() {
  let s = store().await;
  let a = profile(&s, "alice").await;
  let admin = profile(&s, "admin").await;
  let VerificationInsert::Created(req) = s.insert_verification(request(a), t0()).await.unwrap()
  else {
    panic!("expected created request");
  };
  s.decide_verification(req.id, admin, Decision::Reject, None, t0()).await.unwrap();
  assert!(!s.get_profile(a).await.unwrap().unwrap().is_verified);

  let later = t0() + Duration::hours(1);
  assert!(matches!(
    s.insert_verification(request(a), later).await.unwrap(),
    VerificationInsert::Created(_)
  ));
  let latest = s.latest_verification(a).await.unwrap().unwrap();
  assert_eq!(latest.status, VerificationStatus::Pending);
  assert_eq!(latest.created_at, later);
}
