//! JSON REST API for Agora.
//!
//! Exposes an axum [`Router`] backed by an [`Engine`] over any
//! [`agora_core::store::SocialStore`]. Identity arrives pre-authenticated in
//! the `x-user-id` header (see [`auth`]); TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", agora_api::api_router(engine.clone()))
//! ```

pub mod auth;
pub mod error;
pub mod extract;
pub mod feeds;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod stories;
pub mod verification;

use std::sync::Arc;

use agora_core::{clock::Clock, store::SocialStore};
use agora_engine::Engine;
use axum::{
  Router,
  routing::{get, post, put},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// `?cursor=<opaque>&limit=<n>` on every paginated listing.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub cursor: Option<String>,
  pub limit:  Option<usize>,
}

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(engine: Arc<Engine<S, C>>) -> Router<()>
where
  S: SocialStore + 'static,
  C: Clock + 'static,
{
  Router::new()
    // Profiles
    .route(
      "/me",
      get(profiles::me::<S, C>).post(profiles::ensure::<S, C>).patch(profiles::update::<S, C>),
    )
    .route("/me/username", put(profiles::change_username::<S, C>))
    .route("/profiles/{id}", get(profiles::get_one::<S, C>))
    .route("/users/recommended", get(profiles::recommended::<S, C>))
    .route("/users/{username}", get(profiles::by_username::<S, C>))
    .route("/profiles/{id}/posts", get(feeds::user_posts::<S, C>))
    .route("/profiles/{id}/followers", get(profiles::followers::<S, C>))
    .route("/profiles/{id}/following", get(profiles::following::<S, C>))
    .route("/profiles/{id}/stories", get(stories::reel::<S, C>))
    // Graph
    .route(
      "/profiles/{id}/follow",
      put(profiles::follow::<S, C>).delete(profiles::unfollow::<S, C>),
    )
    .route(
      "/profiles/{id}/block",
      put(profiles::block::<S, C>).delete(profiles::unblock::<S, C>),
    )
    // Posts
    .route("/posts", post(posts::create::<S, C>))
    .route("/posts/{id}", get(posts::get_one::<S, C>).delete(posts::delete_one::<S, C>))
    .route("/posts/{id}/like", put(posts::like::<S, C>).delete(posts::unlike::<S, C>))
    .route("/posts/{id}/like/toggle", post(posts::toggle_like::<S, C>))
    .route(
      "/posts/{id}/comments",
      get(posts::comments::<S, C>).post(posts::add_comment::<S, C>),
    )
    // Feeds
    .route("/feed/home", get(feeds::home::<S, C>))
    .route("/feed/explore", get(feeds::explore::<S, C>))
    .route("/search", get(feeds::search::<S, C>))
    // Stories
    .route("/stories", post(stories::create::<S, C>))
    .route("/stories/tray", get(stories::tray::<S, C>))
    // Notifications
    .route("/notifications", get(notifications::list::<S, C>))
    .route("/notifications/unread", get(notifications::unread::<S, C>))
    .route("/notifications/read-all", post(notifications::read_all::<S, C>))
    .route("/notifications/{id}/read", post(notifications::read_one::<S, C>))
    // Verification
    .route("/verification", post(verification::submit::<S, C>))
    .route("/verification/me", get(verification::mine::<S, C>))
    .route("/admin/verifications", get(verification::pending::<S, C>))
    .route("/admin/verifications/{id}", get(verification::get_one::<S, C>))
    .route("/admin/verifications/{id}/decision", post(verification::decide::<S, C>))
    .route("/admin/stats", get(verification::stats::<S, C>))
    .route(
      "/admin/recommended/{id}",
      put(verification::recommend::<S, C>).delete(verification::unrecommend::<S, C>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(engine)
}

#[cfg(test)]
mod tests;
