//! Reading and acknowledging notifications. Writing them is fan-out's job.

use std::collections::HashMap;

use agora_core::{
  Error, Id, Result,
  clock::Clock,
  cursor::{Cursor, PageRequest},
  notification::{NotificationPage, NotificationView},
  store::SocialStore,
};

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  /// The viewer's notifications, newest first, with the unread total.
  pub async fn notifications(
    &self,
    viewer: Id,
    cursor: Option<&str>,
    limit: Option<usize>,
  ) -> Result<NotificationPage> {
    let limit = self.config.page_size(limit);
    let page = PageRequest { cursor: Cursor::parse(cursor)?, limit: limit + 1 };

    let (mut notifications, unread) = tokio::try_join!(
      self.store.notifications_for(viewer, page),
      self.store.unread_notifications(viewer),
    )
    .map_err(Error::store)?;

    let next_cursor = if notifications.len() > limit {
      notifications.truncate(limit);
      notifications.last().map(|n| Cursor::new(n.created_at, n.id).encode())
    } else {
      None
    };

    let mut actor_ids: Vec<Id> = notifications.iter().map(|n| n.actor_id).collect();
    actor_ids.sort_unstable();
    actor_ids.dedup();
    let actors: HashMap<Id, _> = self
      .store
      .profiles_by_ids(&actor_ids)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|p| (p.id, p.summary()))
      .collect();

    let items = notifications
      .into_iter()
      .map(|n| NotificationView { actor: actors.get(&n.actor_id).cloned(), notification: n })
      .collect();
    Ok(NotificationPage { items, unread, next_cursor })
  }

  pub async fn mark_notification_read(&self, viewer: Id, id: Id) -> Result<()> {
    if self.store.mark_notification_read(viewer, id).await.map_err(Error::store)? {
      Ok(())
    } else {
      Err(Error::NotFound(format!("notification {id}")))
    }
  }

  /// Returns how many notifications were newly marked read.
  pub async fn mark_all_notifications_read(&self, viewer: Id) -> Result<u64> {
    self.store.mark_all_notifications_read(viewer).await.map_err(Error::store)
  }

  pub async fn unread_count(&self, viewer: Id) -> Result<u64> {
    self.store.unread_notifications(viewer).await.map_err(Error::store)
  }
}
