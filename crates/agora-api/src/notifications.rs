//! Handlers for `/notifications` endpoints. All require a viewer.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notifications` | `?cursor=&limit=`, newest first |
//! | `GET`  | `/notifications/unread` | `{"unread":n}` |
//! | `POST` | `/notifications/read-all` | `{"marked":n}` |
//! | `POST` | `/notifications/{id}/read` | 404 unless the caller is the recipient |

use std::sync::Arc;

use agora_core::{Id, clock::Clock, notification::NotificationPage, store::SocialStore};
use agora_engine::Engine;
use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use serde_json::{Value, json};

use crate::{
  PageParams,
  auth::Viewer,
  error::ApiError,
  extract::{PathParam, QueryParams},
};

/// `GET /notifications`
pub async fn list<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<NotificationPage>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.notifications(viewer, page.cursor.as_deref(), page.limit).await?))
}

/// `GET /notifications/unread`
pub async fn unread<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Value>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let unread = engine.unread_count(viewer).await?;
  Ok(Json(json!({ "unread": unread })))
}

/// `POST /notifications/read-all`
pub async fn read_all<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Value>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let marked = engine.mark_all_notifications_read(viewer).await?;
  Ok(Json(json!({ "marked": marked })))
}

/// `POST /notifications/{id}/read`
pub async fn read_one<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<StatusCode, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  engine.mark_notification_read(viewer, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
