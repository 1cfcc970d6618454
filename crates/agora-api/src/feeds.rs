//! Handlers for feeds and search.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/feed/home` | Authenticated; `?cursor=&limit=` |
//! | `GET` | `/feed/explore` | Anonymous allowed; ranked by engagement |
//! | `GET` | `/profiles/{id}/posts` | One author's posts, newest first |
//! | `GET` | `/search?q=` | Posts and profiles; a blank query returns nothing |

use std::sync::Arc;

use agora_core::{
  Id,
  clock::Clock,
  engagement::{FeedPage, SearchResults},
  store::SocialStore,
};
use agora_engine::Engine;
use axum::{Json, extract::State};
use serde::Deserialize;

use crate::{
  PageParams,
  auth::{MaybeViewer, Viewer},
  error::ApiError,
  extract::{PathParam, QueryParams},
};

/// `GET /feed/home`
pub async fn home<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  Viewer(viewer): Viewer,
  QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<FeedPage>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.home_feed(viewer, page.cursor.as_deref(), page.limit).await?))
}

/// `GET /feed/explore`
pub async fn explore<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  MaybeViewer(viewer): MaybeViewer,
  QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<FeedPage>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.explore_feed(viewer, page.cursor.as_deref(), page.limit).await?))
}

/// `GET /profiles/{id}/posts`
pub async fn user_posts<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  MaybeViewer(viewer): MaybeViewer,
  PathParam(id): PathParam<Id>,
  QueryParams(page): QueryParams<PageParams>,
) -> Result<Json<FeedPage>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.user_posts(viewer, id, page.cursor.as_deref(), page.limit).await?))
}

// ─── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  #[serde(default)]
  pub q:     String,
  pub limit: Option<usize>,
}

/// `GET /search?q=<text>[&limit=<n>]`
pub async fn search<S, C>(
  State(engine): State<Arc<Engine<S, C>>>,
  MaybeViewer(viewer): MaybeViewer,
  QueryParams(params): QueryParams<SearchParams>,
) -> Result<Json<SearchResults>, ApiError>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Ok(Json(engine.search(&params.q, viewer, params.limit).await?))
}
