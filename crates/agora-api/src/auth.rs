//! Viewer extractors.
//!
//! Authentication happens upstream; the identity provider forwards the
//! authenticated profile id in the `x-user-id` header and the API trusts it.

use agora_core::{Error, Id};
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller. Rejects with 401 when the header is absent.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Id);

/// The caller if authenticated; anonymous reads get `None`.
#[derive(Debug, Clone, Copy)]
pub struct MaybeViewer(pub Option<Id>);

fn viewer_from(parts: &Parts) -> Result<Option<Id>, ApiError> {
  let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
    return Ok(None);
  };
  let id = raw
    .to_str()
    .ok()
    .and_then(|s| Id::parse_str(s.trim()).ok())
    .ok_or(Error::Unauthenticated)?;
  Ok(Some(id))
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
    Ok(Viewer(viewer_from(parts)?.ok_or(Error::Unauthenticated)?))
  }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeViewer {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
    Ok(MaybeViewer(viewer_from(parts)?))
  }
}
