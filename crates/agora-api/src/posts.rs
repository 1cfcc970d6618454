//! Handlers for posts, likes and comments.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/posts` | Body: `{"body":"...","image_ref":null}`; throttled per author |
//! | `GET`    | `/posts/{id}` | Post with author and engagement |
//! | `DELETE` | `/posts/{id}` | Author only; removes likes and comments with it |
//! | `PUT`    | `/posts/{id}/like` | Idempotent |
//! | `DELETE` | `/posts/{id}/like` | Idempotent |
//! | `POST`   | `/posts/{id}/like/toggle` | |
//! | `GET`    | `/posts/{id}/comments` | `?cursor=&limit=`, oldest first |
//! | `POST`   | `/posts/{id}/comments` | Body: `{"body":"..."}` |

use std::sync::Arc;

use agora_core::{
  Id,
  clock::Clock,
  content::{Comment, CommentPage, Post},
  engagement::{FeedItem, LikeState},
  store::SocialStore,
};
use agora_engine::Engine;
use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{
  PageParams,
  auth::{MaybeViewer, Viewer},
  error::ApiError,
  extract::{JsonBody, PathParam, QueryParams},
};

// ─── Posts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub body:      String,
  #[serde(default)]
  pub image_ref: Option<String>,
}

/// `POST /posts`
pub async fn create<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let post: Post = engine.create_post(viewer, &body.body, body.image_ref.as_deref()).await?;
  Ok((StatusCode::CREATED, Json(post)))
}

/// `GET /posts/{id}`
pub async fn get_one<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  MaybeViewer(viewer): MaybeViewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<FeedItem>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.get_post(viewer, id).await?))
}

/// `DELETE /posts/{id}`
pub async fn delete_one<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<StatusCode, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  engine.delete_post(viewer, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Likes ────────────────────────────────────────────────────────────────────

/// `PUT /posts/{id}/like`
pub async fn like<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<LikeState>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.like(viewer, id).await?))
}

/// `DELETE /posts/{id}/like`
pub async fn unlike<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<LikeState>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.unlike(viewer, id).await?))
}

/// `POST /posts/{id}/like/toggle`
pub async fn toggle_like<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<LikeState>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.toggle_like(viewer, id).await?))
}

// ─── Comments ─────────────────────────────────────────────────────────────────

/// `GET /posts/{id}/comments[?cursor=&limit=]`
pub async fn comments<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  MaybeViewer(viewer): MaybeViewer,
  PathParam(id): PathParam<Id>,
  QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<CommentPage>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.list_comments(viewer, id, page.cursor.as_deref(), page.limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  pub body: String,
}

/// `POST /posts/{id}/comments`
pub async fn add_comment<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
  JsonBody(body): JsonBody<CommentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let comment: Comment = engine.add_comment(viewer, id, &body.body).await?;
  Ok((StatusCode::CREATED, Json(comment)))
}
