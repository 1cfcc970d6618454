//! Handlers for stories.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/stories` | Body: `{"body":"...","image_ref":"..."}`; one of the two is required |
//! | `GET`  | `/stories/tray` | Followed authors with unexpired stories |
//! | `GET`  | `/profiles/{id}/stories` | One author's reel, oldest first |

use std::sync::Arc;

use agora_core::{
  Id,
  clock::Clock,
  content::{StoryReel, StorySummary},
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
  auth::Viewer,
  error::ApiError,
  extract::{JsonBody, PathParam},
};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(default)]
  pub body:      Option<String>,
  #[serde(default)]
  pub image_ref: Option<String>,
}

/// `POST /stories`
pub async fn create<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let story = engine.create_story(viewer, body.body.as_deref(), body.image_ref.as_deref()).await?;
  Ok((StatusCode::CREATED, Json(story)))
}

/// `GET /stories/tray`
pub async fn tray<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Vec<StorySummary>>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.story_tray(viewer).await?))
}

/// `GET /profiles/{id}/stories`
pub async fn reel<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<StoryReel>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.story_reel(viewer, id).await?))
}
