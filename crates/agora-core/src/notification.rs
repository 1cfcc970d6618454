//! Notifications — append-only records produced by fan-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Id, profile::ProfileSummary};

/// Discriminant stored in the `kind` column.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
  Like,
  Comment,
  Follow,
}

/// What a notification is about. Each variant carries exactly the entity it
/// references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
  Like { post_id: Id },
  Comment { post_id: Id },
  Follow,
}

impl NotificationKind {
  pub fn notification_type(&self) -> NotificationType {
    match self {
      Self::Like { .. } => NotificationType::Like,
      Self::Comment { .. } => NotificationType::Comment,
      Self::Follow => NotificationType::Follow,
    }
  }

  pub fn post_id(&self) -> Option<Id> {
    match self {
      Self::Like { post_id } | Self::Comment { post_id } => Some(*post_id),
      Self::Follow => None,
    }
  }

  /// Rebuild from the stored discriminant and nullable post column.
  pub fn from_parts(kind: NotificationType, post_id: Option<Id>) -> Option<Self> {
    match (kind, post_id) {
      (NotificationType::Like, Some(post_id)) => Some(Self::Like { post_id }),
      (NotificationType::Comment, Some(post_id)) => Some(Self::Comment { post_id }),
      (NotificationType::Follow, _) => Some(Self::Follow),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub id:           Id,
  pub recipient_id: Id,
  pub actor_id:     Id,
  #[serde(flatten)]
  pub kind:         NotificationKind,
  pub is_read:      bool,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
  pub recipient_id: Id,
  pub actor_id:     Id,
  pub kind:         NotificationKind,
}

impl NewNotification {
  /// Build a notification unless it would notify the actor about their own
  /// action.
  pub fn between(actor_id: Id, recipient_id: Id, kind: NotificationKind) -> Option<Self> {
    (actor_id != recipient_id).then_some(Self { recipient_id, actor_id, kind })
  }
}

/// A notification with its actor rendered for display.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
  #[serde(flatten)]
  pub notification: Notification,
  pub actor:        Option<ProfileSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
  pub items:       Vec<NotificationView>,
  pub unread:      u64,
  pub next_cursor: Option<String>,
}
