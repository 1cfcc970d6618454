//! API error type and [`axum::response::IntoResponse`] implementation.

use std::time::Duration;

use agora_core::Error;
use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Engine(#[from] Error),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Engine(e) => match e {
        Error::Unauthenticated => StatusCode::UNAUTHORIZED,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      ApiError::BadRequest(_) => "bad_request",
      ApiError::Engine(e) => e.kind(),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

/// Whole seconds, rounded up, so a client that waits exactly this long is
/// never turned away again.
fn retry_after_secs(d: Duration) -> u64 { d.as_secs() + u64::from(d.subsec_nanos() > 0) }

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!(error = %self, "request failed");
    }

    let retry_after = match &self {
      ApiError::Engine(Error::RateLimited { retry_after }) => Some(retry_after_secs(*retry_after)),
      _ => None,
    };

    let body = Json(json!({ "error": self.to_string(), "kind": self.kind() }));
    let mut res = (status, body).into_response();
    if let Some(secs) = retry_after {
      res.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn retry_after_rounds_up() {
    assert_eq!(retry_after_secs(Duration::from_secs(30)), 30);
    assert_eq!(retry_after_secs(Duration::from_millis(29_001)), 30);
    assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
  }

  #[test]
  fn rate_limited_sets_header() {
    let err = ApiError::from(Error::RateLimited { retry_after: Duration::from_millis(4_500) });
    let res = err.into_response();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers().get(header::RETRY_AFTER).unwrap(), "5");
  }

  #[test]
  fn taxonomy_maps_to_statuses() {
    let cases = [
      (Error::Unauthenticated, StatusCode::UNAUTHORIZED),
      (Error::NotFound("post".into()), StatusCode::NOT_FOUND),
      (Error::Conflict("taken".into()), StatusCode::CONFLICT),
      (Error::Forbidden("nope".into()), StatusCode::FORBIDDEN),
      (Error::Validation("empty".into()), StatusCode::UNPROCESSABLE_ENTITY),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }
}
