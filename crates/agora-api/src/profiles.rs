//! Handlers for profiles and the social graph.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/me` | Body: [`EnsureBody`]; creates the caller's profile on first login |
//! | `GET`    | `/me` | The caller's own profile view |
//! | `PATCH`  | `/me` | Body: [`ProfilePatch`] |
//! | `PUT`    | `/me/username` | Body: `{"username":"..."}`; subject to the change cooldown |
//! | `GET`    | `/profiles/{id}` | Profile view with counts |
//! | `GET`    | `/users/{username}` | Case-insensitive lookup |
//! | `GET`    | `/users/recommended[?limit=<n>]` | Who to follow |
//! | `GET`    | `/profiles/{id}/followers` | |
//! | `GET`    | `/profiles/{id}/following` | |
//! | `PUT`    | `/profiles/{id}/follow` | Idempotent |
//! | `DELETE` | `/profiles/{id}/follow` | Idempotent |
//! | `PUT`    | `/profiles/{id}/block` | Idempotent |
//! | `DELETE` | `/profiles/{id}/block` | Idempotent |

use std::sync::Arc;

use agora_core::{
  Id,
  clock::Clock,
  profile::{Profile, ProfilePatch, ProfileSummary, ProfileView},
  store::SocialStore,
};
use agora_engine::Engine;
use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
  auth::{MaybeViewer, Viewer},
  error::ApiError,
  extract::{JsonBody, PathParam, QueryParams},
};

// ─── Own profile ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EnsureBody {
  pub username:     String,
  pub display_name: String,
}

/// `POST /me`
pub async fn ensure<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<EnsureBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let profile = engine.ensure_profile(viewer, &body.username, &body.display_name).await?;
  Ok((StatusCode::CREATED, Json(profile)))
}

/// `GET /me`
pub async fn me<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
) -> Result<Json<ProfileView>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.get_profile(Some(viewer), viewer).await?))
}

/// `PATCH /me`
pub async fn update<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  JsonBody(patch): JsonBody<ProfilePatch>,
) -> Result<Json<Profile>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.update_profile(viewer, patch).await?))
}

#[derive(Debug, Deserialize)]
pub struct UsernameBody {
  pub username: String,
}

/// `PUT /me/username`
pub async fn change_username<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<UsernameBody>,
) -> Result<Json<Profile>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.change_username(viewer, &body.username).await?))
}

// ─── Other profiles ───────────────────────────────────────────────────────────

/// `GET /profiles/{id}`
pub async fn get_one<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  MaybeViewer(viewer): MaybeViewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<ProfileView>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.get_profile(viewer, id).await?))
}

/// `GET /users/{username}`
pub async fn by_username<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  MaybeViewer(viewer): MaybeViewer,
  PathParam(username): PathParam<String>,
) -> Result<Json<ProfileView>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.get_profile_by_username(viewer, &username).await?))
}

/// `GET /profiles/{id}/followers`
pub async fn followers<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  MaybeViewer(viewer): MaybeViewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<Vec<ProfileSummary>>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.followers(viewer, id).await?))
}

/// `GET /profiles/{id}/following`
pub async fn following<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  MaybeViewer(viewer): MaybeViewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<Vec<ProfileSummary>>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.following(viewer, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RecommendedParams {
  pub limit: Option<usize>,
}

/// `GET /users/recommended[?limit=<n>]`
pub async fn recommended<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  QueryParams(params): QueryParams<RecommendedParams>,
) -> Result<Json<Vec<ProfileSummary>>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.recommended_users(viewer, params.limit).await?))
}

// ─── Edges ────────────────────────────────────────────────────────────────────

/// Result of an edge mutation. `changed` is `false` for a repeated request.
#[derive(Debug, Serialize)]
pub struct EdgeState {
  pub active:  bool,
  pub changed: bool,
}

/// `PUT /profiles/{id}/follow`
pub async fn follow<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<EdgeState>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let changed = engine.follow(viewer, id).await?;
  Ok(Json(EdgeState { active: true, changed }))
}

/// `DELETE /profiles/{id}/follow`
pub async fn unfollow<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<EdgeState>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let changed = engine.unfollow(viewer, id).await?;
  Ok(Json(EdgeState { active: false, changed }))
}

/// `PUT /profiles/{id}/block`
pub async fn block<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<EdgeState>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let changed = engine.block(viewer, id).await?;
  Ok(Json(EdgeState { active: true, changed }))
}

/// `DELETE /profiles/{id}/block`
pub async fn unblock<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  PathParam(id): PathParam<Id>,
) -> Result<Json<EdgeState>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  let changed = engine.unblock(viewer, id).await?;
  Ok(Json(EdgeState { active: false, changed }))
}
