//! Notification Fan-out.
//!
//! Runs after the primary write has committed. A failure here is logged and
//! swallowed: the like, comment or follow that triggered it stands.

use agora_core::{
  Id,
  clock::Clock,
  notification::{NewNotification, NotificationKind},
  store::{NotificationInsert, SocialStore},
};
use tracing::{debug, warn};

use crate::Engine;

impl<S, C> Engine<S, C>
where
  S: SocialStore,
  C: Clock,
{
  pub(crate) async fn fan_out(&self, actor: Id, recipient: Id, kind: NotificationKind) {
    let Some(notification) = NewNotification::between(actor, recipient, kind) else {
      return;
    };
    let now = self.now();
    let suppress_since = self.config.notification_dedup().map(|window| now - window);

    match self.store.insert_notification(notification, now, suppress_since).await {
      Ok(NotificationInsert::Inserted(_)) => {}
      Ok(NotificationInsert::Suppressed) => {
        debug!(
          %actor,
          %recipient,
          kind = %kind.notification_type(),
          "duplicate notification suppressed"
        );
      }
      Err(e) => {
        warn!(
          error = %e,
          %actor,
          %recipient,
          kind = %kind.notification_type(),
          "notification fan-out failed"
        );
      }
    }
  }
}
