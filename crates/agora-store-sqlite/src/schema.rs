//! SQL schema for the Agora SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Timestamps are fixed-width RFC 3339 strings (microsecond precision, `Z`
/// suffix), so lexical order equals chronological order and keyset
/// comparisons can run in SQL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    id                   TEXT PRIMARY KEY,
    username             TEXT NOT NULL COLLATE NOCASE,
    display_name         TEXT NOT NULL,
    bio                  TEXT,
    avatar_ref           TEXT,
    is_private           INTEGER NOT NULL DEFAULT 0,
    is_verified          INTEGER NOT NULL DEFAULT 0,
    role                 TEXT NOT NULL DEFAULT 'user',   -- 'user' | 'admin'
    last_username_change TEXT,
    created_at           TEXT NOT NULL
);

-- Username uniqueness is a storage-level invariant.
CREATE UNIQUE INDEX IF NOT EXISTS profiles_username_uq ON profiles(username COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS follows (
    follower_id TEXT NOT NULL REFERENCES profiles(id),
    followee_id TEXT NOT NULL REFERENCES profiles(id),
    created_at  TEXT NOT NULL,
    PRIMARY KEY (follower_id, followee_id),
    CHECK (follower_id != followee_id)
);

CREATE INDEX IF NOT EXISTS follows_followee_idx ON follows(followee_id);

CREATE TABLE IF NOT EXISTS blocks (
    blocker_id TEXT NOT NULL REFERENCES profiles(id),
    blocked_id TEXT NOT NULL REFERENCES profiles(id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (blocker_id, blocked_id),
    CHECK (blocker_id != blocked_id)
);

CREATE INDEX IF NOT EXISTS blocks_blocked_idx ON blocks(blocked_id);

CREATE TABLE IF NOT EXISTS posts (
    id         TEXT PRIMARY KEY,
    author_id  TEXT NOT NULL REFERENCES profiles(id),
    body       TEXT NOT NULL,
    image_ref  TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS posts_author_created_idx ON posts(author_id, created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS posts_created_idx        ON posts(created_at DESC, id DESC);

CREATE TABLE IF NOT EXISTS comments (
    id         TEXT PRIMARY KEY,
    post_id    TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    author_id  TEXT NOT NULL REFERENCES profiles(id),
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS comments_post_idx ON comments(post_id, created_at, id);

-- At most one like per (post, user): existence is the state.
CREATE TABLE IF NOT EXISTS likes (
    post_id    TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    user_id    TEXT NOT NULL REFERENCES profiles(id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE INDEX IF NOT EXISTS likes_user_idx ON likes(user_id, post_id);

CREATE TABLE IF NOT EXISTS stories (
    id         TEXT PRIMARY KEY,
    author_id  TEXT NOT NULL REFERENCES profiles(id),
    body       TEXT,
    image_ref  TEXT,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,   -- fixed at insert, never updated
    CHECK (body IS NOT NULL OR image_ref IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS stories_author_expiry_idx ON stories(author_id, expires_at);

-- Append-only apart from the read flag.
CREATE TABLE IF NOT EXISTS notifications (
    id           TEXT PRIMARY KEY,
    recipient_id TEXT NOT NULL REFERENCES profiles(id),
    actor_id     TEXT NOT NULL REFERENCES profiles(id),
    kind         TEXT NOT NULL,   -- 'like' | 'comment' | 'follow'
    post_id      TEXT REFERENCES posts(id) ON DELETE CASCADE,
    is_read      INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    CHECK (recipient_id != actor_id)
);

CREATE INDEX IF NOT EXISTS notifications_recipient_idx ON notifications(recipient_id, created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS notifications_dedup_idx     ON notifications(recipient_id, actor_id, kind, created_at);

-- A gate, never a source of truth.
CREATE TABLE IF NOT EXISTS rate_limits (
    user_id        TEXT NOT NULL,
    action         TEXT NOT NULL,
    last_action_at TEXT NOT NULL,
    PRIMARY KEY (user_id, action)
);

CREATE TABLE IF NOT EXISTS verification_requests (
    id           TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES profiles(id),
    bio          TEXT NOT NULL,
    social_links TEXT NOT NULL DEFAULT '{}',   -- JSON object
    status       TEXT NOT NULL DEFAULT 'pending',
    admin_notes  TEXT,
    decided_by   TEXT REFERENCES profiles(id),
    created_at   TEXT NOT NULL,
    decided_at   TEXT
);

-- One outstanding request per profile.
CREATE UNIQUE INDEX IF NOT EXISTS verification_pending_uq
    ON verification_requests(user_id) WHERE status = 'pending';

-- Curated by admins.
CREATE TABLE IF NOT EXISTS recommended_users (
    user_id    TEXT PRIMARY KEY REFERENCES profiles(id),
    added_by   TEXT NOT NULL REFERENCES profiles(id),
    created_at TEXT NOT NULL
);

PRAGMA user_version = 1;
";
