//! [`SqliteStore`] — the SQLite implementation of [`SocialStore`].

use std::{
  collections::{HashMap, HashSet},
  path::Path,
  time::Duration as StdDuration,
};

use agora_core::{
  Id,
  content::{Comment, NewComment, NewPost, NewStory, Post, Story, story_ttl},
  cursor::PageRequest,
  engagement::LikeState,
  notification::{NewNotification, Notification},
  profile::{NewProfile, Profile, ProfilePatch, Role, Stats},
  ratelimit::RateDecision,
  store::{
    Deletion, NotificationInsert, PostQuery, ProfileCounts, ProfileInsert, SocialStore,
    UsernameChange, VerificationDecision, VerificationInsert,
  },
  verification::{Decision, NewVerification, VerificationRequest, VerificationStatus},
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{
  Connection, OptionalExtension as _, TransactionBehavior,
  functions::FunctionFlags,
  params, params_from_iter,
  types::Value,
};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    COMMENT_COLUMNS, NOTIFICATION_COLUMNS, POST_COLUMNS, PROFILE_COLUMNS, RawComment,
    RawNotification, RawPost, RawProfile, RawStory, RawVerification, STORY_COLUMNS,
    VERIFICATION_COLUMNS, decode_dt, decode_enum, decode_uuid, encode_dt, encode_uuid, encode_uuids,
    like_pattern, placeholders, stored_precision,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Agora store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a grouped `post_id -> COUNT(*)` query over an id set.
  async fn grouped_counts(&self, table: &'static str, post_ids: &[Id]) -> Result<HashMap<Id, u64>> {
    if post_ids.is_empty() {
      return Ok(HashMap::new());
    }
    let ids = encode_uuids(post_ids);

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT post_id, COUNT(*) FROM {table}
           WHERE post_id IN ({})
           GROUP BY post_id",
          placeholders(1, ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(ids.iter()), |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, n)| Ok((decode_uuid(&id)?, n.max(0) as u64)))
      .collect()
  }

  async fn id_list(&self, sql: &'static str, user: Id) -> Result<Vec<Id>> {
    let user_str = encode_uuid(user);
    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(params![user_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn edge_exists(&self, sql: &'static str, a: Id, b: Id) -> Result<bool> {
    let (a, b) = (encode_uuid(a), encode_uuid(b));
    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(sql, params![a, b], |_| Ok(())).optional()?.is_some())
      })
      .await?;
    Ok(exists)
  }

  async fn execute_changes(&self, sql: &'static str, args: Vec<Value>) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, params_from_iter(args.iter()))?))
      .await?;
    Ok(changed)
  }

  /// Load a single request; `filter` is everything after `FROM`.
  async fn load_verification(
    &self,
    filter: &'static str,
    key: Id,
  ) -> Result<Option<VerificationRequest>> {
    let key = encode_uuid(key);
    let raw: Option<RawVerification> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {VERIFICATION_COLUMNS} FROM verification_requests {filter}");
        Ok(conn.query_row(&sql, params![key], RawVerification::from_row).optional()?)
      })
      .await?;
    raw.map(RawVerification::into_request).transpose()
  }
}

// ─── Connection-level helpers ────────────────────────────────────────────────

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

fn query_profile(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawProfile>> {
  conn
    .query_row(
      &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
      params![id],
      RawProfile::from_row,
    )
    .optional()
}

fn post_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM posts WHERE id = ?1", params![id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

fn like_count(conn: &Connection, post_id: &str) -> rusqlite::Result<u64> {
  let n: i64 =
    conn.query_row("SELECT COUNT(*) FROM likes WHERE post_id = ?1", params![post_id], |r| r.get(0))?;
  Ok(n.max(0) as u64)
}

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

/// `fold_case(text)`: full Unicode lowercasing. SQLite's own `LIKE` and
/// `lower()` only fold ASCII.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "fold_case",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|t| t.to_lowercase())),
  )
}

fn clamp_window(window: StdDuration) -> Duration {
  // Ten years is far beyond any configured cooldown.
  Duration::seconds(window.as_secs().min(315_360_000) as i64)
}

fn std_duration(d: Duration) -> StdDuration { d.to_std().unwrap_or_default() }

// ─── SocialStore impl ────────────────────────────────────────────────────────

impl SocialStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn create_profile(&self, input: NewProfile, now: DateTime<Utc>) -> Result<ProfileInsert> {
    enum Raw {
      Created(RawProfile),
      Existing(RawProfile),
      Taken,
    }

    let id_str = encode_uuid(input.id);
    let at_str = encode_dt(stored_precision(now));

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(existing) = query_profile(&tx, &id_str)? {
          return Ok(Raw::Existing(existing));
        }

        let inserted = tx.execute(
          "INSERT INTO profiles (id, username, display_name, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![id_str, input.username, input.display_name, at_str],
        );
        match inserted {
          Ok(_) => {}
          Err(e) if is_constraint_violation(&e) => return Ok(Raw::Taken),
          Err(e) => return Err(e.into()),
        }

        let created =
          query_profile(&tx, &id_str)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(Raw::Created(created))
      })
      .await?;

    Ok(match raw {
      Raw::Created(p) => ProfileInsert::Created(p.into_profile()?),
      Raw::Existing(p) => ProfileInsert::Existing(p.into_profile()?),
      Raw::Taken => ProfileInsert::UsernameTaken,
    })
  }

  async fn get_profile(&self, id: Id) -> Result<Option<Profile>> {
    let id_str = encode_uuid(id);
    let raw = self.conn.call(move |conn| Ok(query_profile(conn, &id_str)?)).await?;
    raw.map(RawProfile::into_profile).transpose()
  }

  async fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
    let name = username.trim().to_owned();
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE username = ?1 COLLATE NOCASE"),
            params![name],
            RawProfile::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawProfile::into_profile).transpose()
  }

  async fn profiles_by_ids(&self, ids: &[Id]) -> Result<Vec<Profile>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let ids = encode_uuids(ids);

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id IN ({})",
          placeholders(1, ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(ids.iter()), RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn update_profile(&self, id: Id, patch: ProfilePatch) -> Result<Option<Profile>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "UPDATE profiles SET
             display_name = COALESCE(?2, display_name),
             bio          = CASE WHEN ?3 THEN ?4 ELSE bio END,
             avatar_ref   = CASE WHEN ?5 THEN ?6 ELSE avatar_ref END,
             is_private   = COALESCE(?7, is_private)
           WHERE id = ?1",
          params![
            id_str,
            patch.display_name,
            patch.bio.is_some(),
            patch.bio.flatten(),
            patch.avatar_ref.is_some(),
            patch.avatar_ref.flatten(),
            patch.is_private,
          ],
        )?;
        let updated = query_profile(&tx, &id_str)?;
        tx.commit()?;
        Ok(updated)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn change_username(
    &self,
    id: Id,
    username: String,
    now: DateTime<Utc>,
    cooldown: Duration,
  ) -> Result<UsernameChange> {
    enum Raw {
      Changed(RawProfile),
      Taken,
      CoolingDown(String),
      NotFound,
    }

    let id_str = encode_uuid(id);
    let now_str = encode_dt(stored_precision(now));
    let threshold = encode_dt(stored_precision(now - cooldown));

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(current) = query_profile(&tx, &id_str)? else {
          return Ok(Raw::NotFound);
        };
        if current.username == username {
          return Ok(Raw::Changed(current));
        }
        // A change is allowed once `last + cooldown <= now`, i.e.
        // `last <= now - cooldown`.
        if let Some(last) = current.last_username_change.filter(|last| *last > threshold) {
          return Ok(Raw::CoolingDown(last));
        }

        let updated = tx.execute(
          "UPDATE profiles SET username = ?2, last_username_change = ?3 WHERE id = ?1",
          params![id_str, username, now_str],
        );
        match updated {
          Ok(_) => {}
          Err(e) if is_constraint_violation(&e) => return Ok(Raw::Taken),
          Err(e) => return Err(e.into()),
        }

        let changed =
          query_profile(&tx, &id_str)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(Raw::Changed(changed))
      })
      .await?;

    Ok(match raw {
      Raw::Changed(p) => UsernameChange::Changed(p.into_profile()?),
      Raw::Taken => UsernameChange::Taken,
      Raw::CoolingDown(last) => {
        UsernameChange::CoolingDown { eligible_at: decode_dt(&last)? + cooldown }
      }
      Raw::NotFound => UsernameChange::ProfileNotFound,
    })
  }

  async fn set_role(&self, id: Id, role: Role) -> Result<bool> {
    let changed = self
      .execute_changes(
        "UPDATE profiles SET role = ?2 WHERE id = ?1",
        vec![text(encode_uuid(id)), text(role.as_ref())],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn search_profiles(
    &self,
    query: &str,
    viewer: Option<Id>,
    exclude: &[Id],
    limit: usize,
  ) -> Result<Vec<Profile>> {
    let mut args = vec![
      text(like_pattern(query)),
      viewer.map(encode_uuid).map(Value::Text).unwrap_or(Value::Null),
      Value::Integer(limit as i64),
    ];
    let exclusion = if exclude.is_empty() {
      String::new()
    } else {
      let clause = format!("AND pr.id NOT IN ({})", placeholders(args.len() + 1, exclude.len()));
      args.extend(encode_uuids(exclude).into_iter().map(Value::Text));
      clause
    };

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles pr
           WHERE (fold_case(pr.username) LIKE ?1 ESCAPE '\\'
                  OR fold_case(pr.display_name) LIKE ?1 ESCAPE '\\')
             AND (
               pr.is_private = 0
               OR pr.id = ?2
               OR EXISTS (
                 SELECT 1 FROM follows f WHERE f.follower_id = ?2 AND f.followee_id = pr.id
               )
             )
             {exclusion}
           ORDER BY pr.username COLLATE NOCASE
           LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(args.iter()), RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn profile_counts(&self, id: Id) -> Result<ProfileCounts> {
    let id_str = encode_uuid(id);
    let (followers, following, posts): (i64, i64, i64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM follows WHERE followee_id = ?1),
             (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
             (SELECT COUNT(*) FROM posts   WHERE author_id   = ?1)",
          params![id_str],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?)
      })
      .await?;

    Ok(ProfileCounts {
      followers: followers.max(0) as u64,
      following: following.max(0) as u64,
      posts:     posts.max(0) as u64,
    })
  }

  async fn stats(&self) -> Result<Stats> {
    let (profiles, posts, pending): (i64, i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM profiles),
             (SELECT COUNT(*) FROM posts),
             (SELECT COUNT(*) FROM verification_requests WHERE status = 'pending')",
          [],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?)
      })
      .await?;

    Ok(Stats {
      profiles:              profiles.max(0) as u64,
      posts:                 posts.max(0) as u64,
      pending_verifications: pending.max(0) as u64,
    })
  }

  // ── Recommendations ───────────────────────────────────────────────────────

  async fn add_recommended_user(&self, user_id: Id, added_by: Id, now: DateTime<Utc>) -> Result<bool> {
    let changed = self
      .execute_changes(
        "INSERT OR IGNORE INTO recommended_users (user_id, added_by, created_at) VALUES (?1, ?2, ?3)",
        vec![
          text(encode_uuid(user_id)),
          text(encode_uuid(added_by)),
          text(encode_dt(stored_precision(now))),
        ],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn remove_recommended_user(&self, user_id: Id) -> Result<bool> {
    let changed = self
      .execute_changes(
        "DELETE FROM recommended_users WHERE user_id = ?1",
        vec![text(encode_uuid(user_id))],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn recommended_users(&self, viewer: Id, limit: usize) -> Result<Vec<Profile>> {
    let viewer_str = encode_uuid(viewer);
    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {PROFILE_COLUMNS} FROM (
             SELECT pr.*, r.created_at AS recommended_at
             FROM recommended_users r
             JOIN profiles pr ON pr.id = r.user_id
             WHERE pr.id != ?1
               AND NOT EXISTS (
                 SELECT 1 FROM follows f WHERE f.follower_id = ?1 AND f.followee_id = pr.id
               )
               AND NOT EXISTS (
                 SELECT 1 FROM blocks b
                 WHERE (b.blocker_id = ?1 AND b.blocked_id = pr.id)
                    OR (b.blocker_id = pr.id AND b.blocked_id = ?1)
               )
           )
           ORDER BY recommended_at DESC, id
           LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![viewer_str, limit as i64], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  // ── Social graph ──────────────────────────────────────────────────────────

  async fn follow(&self, follower: Id, followee: Id, now: DateTime<Utc>) -> Result<bool> {
    let changed = self
      .execute_changes(
        "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
        vec![
          text(encode_uuid(follower)),
          text(encode_uuid(followee)),
          text(encode_dt(stored_precision(now))),
        ],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn unfollow(&self, follower: Id, followee: Id) -> Result<bool> {
    let changed = self
      .execute_changes(
        "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
        vec![text(encode_uuid(follower)), text(encode_uuid(followee))],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn is_following(&self, follower: Id, followee: Id) -> Result<bool> {
    self
      .edge_exists("SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2", follower, followee)
      .await
  }

  async fn followees(&self, user: Id) -> Result<Vec<Id>> {
    self
      .id_list(
        "SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY created_at DESC",
        user,
      )
      .await
  }

  async fn followers(&self, user: Id) -> Result<Vec<Id>> {
    self
      .id_list(
        "SELECT follower_id FROM follows WHERE followee_id = ?1 ORDER BY created_at DESC",
        user,
      )
      .await
  }

  async fn block(&self, blocker: Id, blocked: Id, now: DateTime<Utc>) -> Result<bool> {
    let changed = self
      .execute_changes(
        "INSERT OR IGNORE INTO blocks (blocker_id, blocked_id, created_at) VALUES (?1, ?2, ?3)",
        vec![
          text(encode_uuid(blocker)),
          text(encode_uuid(blocked)),
          text(encode_dt(stored_precision(now))),
        ],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn unblock(&self, blocker: Id, blocked: Id) -> Result<bool> {
    let changed = self
      .execute_changes(
        "DELETE FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
        vec![text(encode_uuid(blocker)), text(encode_uuid(blocked))],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn is_blocked(&self, blocker: Id, blocked: Id) -> Result<bool> {
    self
      .edge_exists("SELECT 1 FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2", blocker, blocked)
      .await
  }

  async fn block_relations(&self, user: Id) -> Result<Vec<Id>> {
    self
      .id_list(
        "SELECT blocked_id FROM blocks WHERE blocker_id = ?1
         UNION
         SELECT blocker_id FROM blocks WHERE blocked_id = ?1",
        user,
      )
      .await
  }

  // ── Posts & comments ──────────────────────────────────────────────────────

  async fn insert_post(&self, input: NewPost, now: DateTime<Utc>) -> Result<Post> {
    let post = Post {
      id:         Uuid::new_v4(),
      author_id:  input.author_id,
      body:       input.body,
      image_ref:  input.image_ref,
      created_at: stored_precision(now),
    };

    let args = vec![
      text(encode_uuid(post.id)),
      text(encode_uuid(post.author_id)),
      text(post.body.clone()),
      post.image_ref.clone().map(Value::Text).unwrap_or(Value::Null),
      text(encode_dt(post.created_at)),
    ];
    self
      .execute_changes(
        "INSERT INTO posts (id, author_id, body, image_ref, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        args,
      )
      .await?;

    Ok(post)
  }

  async fn get_post(&self, id: Id) -> Result<Option<Post>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
            params![id_str],
            RawPost::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawPost::into_post).transpose()
  }

  async fn delete_post(&self, id: Id, requester: Id) -> Result<Deletion> {
    let id_str = encode_uuid(id);
    let requester_str = encode_uuid(requester);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let author: Option<String> = tx
          .query_row("SELECT author_id FROM posts WHERE id = ?1", params![id_str], |r| r.get(0))
          .optional()?;
        match author {
          None => return Ok(Deletion::NotFound),
          Some(a) if a != requester_str => return Ok(Deletion::NotOwner),
          Some(_) => {}
        }
        // Comments, likes and notifications go with it via ON DELETE CASCADE.
        tx.execute("DELETE FROM posts WHERE id = ?1", params![id_str])?;
        tx.commit()?;
        Ok(Deletion::Deleted)
      })
      .await?;

    Ok(outcome)
  }

  async fn find_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
    if query.limit == 0 || query.authors.as_ref().is_some_and(Vec::is_empty) {
      return Ok(Vec::new());
    }

    let mut conds: Vec<String> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(authors) = &query.authors {
      conds.push(format!("p.author_id IN ({})", vec!["?"; authors.len()].join(", ")));
      args.extend(encode_uuids(authors).into_iter().map(Value::Text));
    }
    if !query.exclude_authors.is_empty() {
      conds.push(format!(
        "p.author_id NOT IN ({})",
        vec!["?"; query.exclude_authors.len()].join(", ")
      ));
      args.extend(encode_uuids(&query.exclude_authors).into_iter().map(Value::Text));
    }
    if let Some(t) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
      conds.push("fold_case(p.body) LIKE ? ESCAPE '\\'".into());
      args.push(text(like_pattern(t)));
    }
    if let Some(since) = query.since {
      conds.push("p.created_at >= ?".into());
      args.push(text(encode_dt(since)));
    }
    if let Some(after) = &query.after {
      let at = encode_dt(after.created_at);
      conds.push("(p.created_at < ? OR (p.created_at = ? AND p.id < ?))".into());
      args.extend([text(at.clone()), text(at), text(encode_uuid(after.id))]);
    }
    if query.enforce_privacy {
      let viewer = query.viewer.map(encode_uuid).map(Value::Text).unwrap_or(Value::Null);
      conds.push(
        "(a.is_private = 0
          OR p.author_id = ?
          OR EXISTS (SELECT 1 FROM follows f WHERE f.follower_id = ? AND f.followee_id = p.author_id))"
          .into(),
      );
      args.extend([viewer.clone(), viewer]);
    }
    args.push(Value::Integer(query.limit as i64));

    let where_clause =
      if conds.is_empty() { String::new() } else { format!("WHERE {}", conds.join(" AND ")) };

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {POST_COLUMNS}
           FROM posts p
           JOIN profiles a ON a.id = p.author_id
           {where_clause}
           ORDER BY p.created_at DESC, p.id DESC
           LIMIT ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(args.iter()), RawPost::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPost::into_post).collect()
  }

  async fn insert_comment(&self, input: NewComment, now: DateTime<Utc>) -> Result<Option<Comment>> {
    let comment = Comment {
      id:         Uuid::new_v4(),
      post_id:    input.post_id,
      author_id:  input.author_id,
      body:       input.body,
      created_at: stored_precision(now),
    };

    let id_str = encode_uuid(comment.id);
    let post_str = encode_uuid(comment.post_id);
    let author_str = encode_uuid(comment.author_id);
    let body = comment.body.clone();
    let at_str = encode_dt(comment.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !post_exists(&tx, &post_str)? {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO comments (id, post_id, author_id, body, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![id_str, post_str, author_str, body, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(inserted.then_some(comment))
  }

  async fn comments_for_post(&self, post_id: Id, page: PageRequest) -> Result<Vec<Comment>> {
    let mut args = vec![text(encode_uuid(post_id)), Value::Integer(page.limit as i64)];
    let keyset = match page.cursor {
      Some(c) => {
        args.extend([text(encode_dt(c.created_at)), text(encode_uuid(c.id))]);
        "AND (created_at > ?3 OR (created_at = ?3 AND id > ?4))"
      }
      None => "",
    };

    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {COMMENT_COLUMNS} FROM comments
           WHERE post_id = ?1 {keyset}
           ORDER BY created_at ASC, id ASC
           LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(args.iter()), RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  // ── Engagement ────────────────────────────────────────────────────────────

  async fn set_like(
    &self,
    post_id: Id,
    user_id: Id,
    liked: bool,
    now: DateTime<Utc>,
  ) -> Result<Option<LikeState>> {
    let post_str = encode_uuid(post_id);
    let user_str = encode_uuid(user_id);
    let at_str = encode_dt(stored_precision(now));

    let state = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !post_exists(&tx, &post_str)? {
          return Ok(None);
        }
        let rows = if liked {
          tx.execute(
            "INSERT OR IGNORE INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![post_str, user_str, at_str],
          )?
        } else {
          tx.execute(
            "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_str, user_str],
          )?
        };
        let changed = rows > 0;
        let like_count = like_count(&tx, &post_str)?;
        tx.commit()?;
        Ok(Some(LikeState { liked, like_count, changed }))
      })
      .await?;

    Ok(state)
  }

  async fn toggle_like(
    &self,
    post_id: Id,
    user_id: Id,
    now: DateTime<Utc>,
  ) -> Result<Option<LikeState>> {
    let post_str = encode_uuid(post_id);
    let user_str = encode_uuid(user_id);
    let at_str = encode_dt(stored_precision(now));

    let state = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !post_exists(&tx, &post_str)? {
          return Ok(None);
        }
        let removed = tx.execute(
          "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
          params![post_str, user_str],
        )? > 0;
        if !removed {
          tx.execute(
            "INSERT INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![post_str, user_str, at_str],
          )?;
        }
        let like_count = like_count(&tx, &post_str)?;
        tx.commit()?;
        Ok(Some(LikeState { liked: !removed, like_count, changed: true }))
      })
      .await?;

    Ok(state)
  }

  async fn like_counts(&self, post_ids: &[Id]) -> Result<HashMap<Id, u64>> {
    self.grouped_counts("likes", post_ids).await
  }

  async fn comment_counts(&self, post_ids: &[Id]) -> Result<HashMap<Id, u64>> {
    self.grouped_counts("comments", post_ids).await
  }

  async fn liked_posts(&self, user_id: Id, post_ids: &[Id]) -> Result<HashSet<Id>> {
    if post_ids.is_empty() {
      return Ok(HashSet::new());
    }
    let mut args = vec![encode_uuid(user_id)];
    args.extend(encode_uuids(post_ids));

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT post_id FROM likes WHERE user_id = ?1 AND post_id IN ({})",
          placeholders(2, args.len() - 1)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(args.iter()), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_uuid(s)).collect()
  }

  // ── Stories ───────────────────────────────────────────────────────────────

  async fn insert_story(&self, input: NewStory, now: DateTime<Utc>) -> Result<Story> {
    let created_at = stored_precision(now);
    let story = Story {
      id: Uuid::new_v4(),
      author_id: input.author_id,
      body: input.body,
      image_ref: input.image_ref,
      created_at,
      expires_at: created_at + story_ttl(),
    };

    let args = vec![
      text(encode_uuid(story.id)),
      text(encode_uuid(story.author_id)),
      story.body.clone().map(Value::Text).unwrap_or(Value::Null),
      story.image_ref.clone().map(Value::Text).unwrap_or(Value::Null),
      text(encode_dt(story.created_at)),
      text(encode_dt(story.expires_at)),
    ];
    self
      .execute_changes(
        "INSERT INTO stories (id, author_id, body, image_ref, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        args,
      )
      .await?;

    Ok(story)
  }

  async fn visible_stories(&self, authors: &[Id], now: DateTime<Utc>) -> Result<Vec<Story>> {
    if authors.is_empty() {
      return Ok(Vec::new());
    }
    let mut args = vec![encode_dt(now)];
    args.extend(encode_uuids(authors));

    let raws: Vec<RawStory> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {STORY_COLUMNS} FROM stories
           WHERE author_id IN ({})
             AND created_at <= ?1
             AND expires_at >  ?1
           ORDER BY created_at DESC, id DESC",
          placeholders(2, args.len() - 1)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(args.iter()), RawStory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStory::into_story).collect()
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn insert_notification(
    &self,
    input: NewNotification,
    now: DateTime<Utc>,
    suppress_since: Option<DateTime<Utc>>,
  ) -> Result<NotificationInsert> {
    let notification = Notification {
      id:           Uuid::new_v4(),
      recipient_id: input.recipient_id,
      actor_id:     input.actor_id,
      kind:         input.kind,
      is_read:      false,
      created_at:   stored_precision(now),
    };

    let id_str = encode_uuid(notification.id);
    let recipient_str = encode_uuid(notification.recipient_id);
    let actor_str = encode_uuid(notification.actor_id);
    let kind_str = notification.kind.notification_type().as_ref().to_owned();
    let post_str = notification.kind.post_id().map(encode_uuid);
    let at_str = encode_dt(notification.created_at);
    let since_str = suppress_since.map(encode_dt);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(since) = since_str {
          let duplicate = tx
            .query_row(
              "SELECT 1 FROM notifications
               WHERE recipient_id = ?1 AND actor_id = ?2 AND kind = ?3
                 AND post_id IS ?4 AND created_at >= ?5",
              params![recipient_str, actor_str, kind_str, post_str, since],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if duplicate {
            return Ok(false);
          }
        }
        tx.execute(
          "INSERT INTO notifications (id, recipient_id, actor_id, kind, post_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![id_str, recipient_str, actor_str, kind_str, post_str, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if inserted {
      NotificationInsert::Inserted(notification)
    } else {
      NotificationInsert::Suppressed
    })
  }

  async fn notifications_for(&self, recipient: Id, page: PageRequest) -> Result<Vec<Notification>> {
    let mut args = vec![text(encode_uuid(recipient)), Value::Integer(page.limit as i64)];
    let keyset = match page.cursor {
      Some(c) => {
        args.extend([text(encode_dt(c.created_at)), text(encode_uuid(c.id))]);
        "AND (created_at < ?3 OR (created_at = ?3 AND id < ?4))"
      }
      None => "",
    };

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE recipient_id = ?1 {keyset}
           ORDER BY created_at DESC, id DESC
           LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(args.iter()), RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn mark_notification_read(&self, recipient: Id, id: Id) -> Result<bool> {
    let changed = self
      .execute_changes(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
        vec![text(encode_uuid(id)), text(encode_uuid(recipient))],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn mark_all_notifications_read(&self, recipient: Id) -> Result<u64> {
    let changed = self
      .execute_changes(
        "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0",
        vec![text(encode_uuid(recipient))],
      )
      .await?;
    Ok(changed as u64)
  }

  async fn unread_notifications(&self, recipient: Id) -> Result<u64> {
    let recipient_str = encode_uuid(recipient);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
          params![recipient_str],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(n.max(0) as u64)
  }

  // ── Rate limiting ─────────────────────────────────────────────────────────

  async fn rate_limit(
    &self,
    user_id: Id,
    action: &str,
    window: StdDuration,
    now: DateTime<Utc>,
  ) -> Result<RateDecision> {
    let window = clamp_window(window);
    let now = stored_precision(now);
    let user_str = encode_uuid(user_id);
    let action = action.to_owned();
    let now_str = encode_dt(now);
    let threshold = encode_dt(now - window);

    let last_denied: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let last: Option<String> = tx
          .query_row(
            "SELECT last_action_at FROM rate_limits WHERE user_id = ?1 AND action = ?2",
            params![user_str, action],
            |r| r.get(0),
          )
          .optional()?;
        // Deny while `now - last < window`, i.e. `last > now - window`.
        if let Some(last) = last.filter(|last| *last > threshold) {
          return Ok(Some(last));
        }
        tx.execute(
          "INSERT INTO rate_limits (user_id, action, last_action_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (user_id, action) DO UPDATE SET last_action_at = excluded.last_action_at",
          params![user_str, action, now_str],
        )?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    Ok(match last_denied {
      None => RateDecision::Allowed,
      Some(last) => {
        let retry_after = std_duration(decode_dt(&last)? + window - now);
        RateDecision::Denied { retry_after }
      }
    })
  }

  // ── Verification ──────────────────────────────────────────────────────────

  async fn insert_verification(
    &self,
    input: NewVerification,
    now: DateTime<Utc>,
  ) -> Result<VerificationInsert> {
    enum Raw {
      Created,
      PendingExists,
      AlreadyVerified,
      ProfileNotFound,
    }

    let request = VerificationRequest {
      id:           Uuid::new_v4(),
      user_id:      input.user_id,
      bio:          input.bio,
      social_links: input.social_links,
      status:       VerificationStatus::Pending,
      admin_notes:  None,
      decided_by:   None,
      created_at:   stored_precision(now),
      decided_at:   None,
    };

    let id_str = encode_uuid(request.id);
    let user_str = encode_uuid(request.user_id);
    let bio = request.bio.clone();
    let links = serde_json::to_string(&request.social_links)?;
    let at_str = encode_dt(request.created_at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let verified: Option<bool> = tx
          .query_row("SELECT is_verified FROM profiles WHERE id = ?1", params![user_str], |r| {
            r.get(0)
          })
          .optional()?;
        match verified {
          None => return Ok(Raw::ProfileNotFound),
          Some(true) => return Ok(Raw::AlreadyVerified),
          Some(false) => {}
        }

        let inserted = tx.execute(
          "INSERT INTO verification_requests (id, user_id, bio, social_links, status, created_at)
           VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
          params![id_str, user_str, bio, links, at_str],
        );
        match inserted {
          Ok(_) => {}
          Err(e) if is_constraint_violation(&e) => return Ok(Raw::PendingExists),
          Err(e) => return Err(e.into()),
        }
        tx.commit()?;
        Ok(Raw::Created)
      })
      .await?;

    Ok(match raw {
      Raw::Created => VerificationInsert::Created(request),
      Raw::PendingExists => VerificationInsert::PendingExists,
      Raw::AlreadyVerified => VerificationInsert::AlreadyVerified,
      Raw::ProfileNotFound => VerificationInsert::ProfileNotFound,
    })
  }

  async fn get_verification(&self, id: Id) -> Result<Option<VerificationRequest>> {
    self
      .load_verification("WHERE id = ?1", id)
      .await
  }

  async fn latest_verification(&self, user_id: Id) -> Result<Option<VerificationRequest>> {
    self
      .load_verification("WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1", user_id)
      .await
  }

  async fn pending_verifications(&self, limit: usize) -> Result<Vec<VerificationRequest>> {
    let raws: Vec<RawVerification> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {VERIFICATION_COLUMNS} FROM verification_requests
           WHERE status = 'pending'
           ORDER BY created_at DESC, id DESC
           LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![limit as i64], RawVerification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVerification::into_request).collect()
  }

  async fn decide_verification(
    &self,
    id: Id,
    admin: Id,
    decision: Decision,
    notes: Option<String>,
    now: DateTime<Utc>,
  ) -> Result<VerificationDecision> {
    enum Raw {
      Decided(RawVerification),
      NotFound,
      AlreadyDecided(String),
    }

    let id_str = encode_uuid(id);
    let admin_str = encode_uuid(admin);
    let status_str = decision.resulting_status().as_ref().to_owned();
    let approve = decision == Decision::Approve;
    let at_str = encode_dt(stored_precision(now));

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<(String, String)> = tx
          .query_row(
            "SELECT status, user_id FROM verification_requests WHERE id = ?1",
            params![id_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let user_id = match current {
          None => return Ok(Raw::NotFound),
          Some((status, _)) if status != "pending" => return Ok(Raw::AlreadyDecided(status)),
          Some((_, user_id)) => user_id,
        };

        tx.execute(
          "UPDATE verification_requests
           SET status = ?2, admin_notes = ?3, decided_by = ?4, decided_at = ?5
           WHERE id = ?1",
          params![id_str, status_str, notes, admin_str, at_str],
        )?;
        if approve {
          tx.execute("UPDATE profiles SET is_verified = 1 WHERE id = ?1", params![user_id])?;
        }

        let decided = tx.query_row(
          &format!("SELECT {VERIFICATION_COLUMNS} FROM verification_requests WHERE id = ?1"),
          params![id_str],
          RawVerification::from_row,
        )?;
        tx.commit()?;
        Ok(Raw::Decided(decided))
      })
      .await?;

    Ok(match raw {
      Raw::Decided(r) => VerificationDecision::Decided(r.into_request()?),
      Raw::NotFound => VerificationDecision::NotFound,
      Raw::AlreadyDecided(status) => {
        VerificationDecision::AlreadyDecided(decode_enum("verification status", &status)?)
      }
    })
  }
}
