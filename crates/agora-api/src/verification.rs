//! Handlers for verification requests and the admin surface.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/verification` | Body: `{"bio":"...","links":{"site":"..."}}`; 409 while one is pending |
//! | `GET`  | `/verification/me` | Latest request or `null` |
//! | `GET`  | `/admin/verifications` | Pending queue, admin only |
//! | `GET`  | `/admin/verifications/{id}` | One request with its applicant |
//! | `POST` | `/admin/verifications/{id}/decision` | Body: `{"decision":"approve","notes":null}` |
//! | `GET`  | `/admin/stats` | Platform counters, admin only |
//! | `PUT`  | `/admin/recommended/{id}` | Add to the who-to-follow list |
//! | `DELETE` | `/admin/recommended/{id}` | Remove from it |

use std::{collections::BTreeMap, sync::Arc};

use agora_core::{
  Id,
  clock::Clock,
  profile::Stats,
  store::SocialStore,
  verification::{Decision, VerificationRequest, VerificationView},
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
  extract::{JsonBody, PathParam, QueryParams},
  profiles::EdgeState,
};

// ─── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub bio:   String,
  #[serde(default)]
  pub links: BTreeMap<String, String>,
}

/// `POST /verification`
pub async fn submit<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let request = engine.submit_verification(viewer, &body.bio, body.links).await?;
  Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /verification/me`
pub async fn mine<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Option<VerificationRequest>>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.my_verification(viewer).await?))
}

// ─── Admin ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueueParams {
  pub limit: Option<usize>,
}

/// `GET /admin/verifications[?limit=<n>]`
pub async fn pending<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(admin): Viewer,
  QueryParams(params): QueryParams<QueueParams>,
) -> Result<Json<Vec<VerificationView>>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.pending_verifications(admin, params.limit).await?))
}

/// `GET /admin/verifications/{id}`
pub async fn get_one<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(admin): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<VerificationView>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.verification_request(admin, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
  pub decision: Decision,
  #[serde(default)]
  pub notes:    Option<String>,
}

/// `POST /admin/verifications/{id}/decision`
pub async fn decide<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(admin): Viewer,
  PathParam(id): PathParam<Id>,
  JsonBody(body): JsonBody<DecisionBody>,
) -> Result<Json<VerificationRequest>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let request =
    engine.decide_verification(admin, id, body.decision, body.notes.as_deref()).await?;
  Ok(Json(request))
}

/// `GET /admin/stats`
pub async fn stats<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(admin): Viewer,
) -> Result<Json<Stats>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.admin_stats(admin).await?))
}

/// `PUT /admin/recommended/{id}`
pub async fn recommend<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(admin): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<EdgeState>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let changed = engine.recommend_user(admin, id).await?;
  Ok(Json(EdgeState { active: true, changed }))
}

/// `DELETE /admin/recommended/{id}`
pub async fn unrecommend<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(admin): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<EdgeState>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let changed = engine.unrecommend_user(admin, id).await?;
  Ok(Json(EdgeState { active: false, changed }))
}
