//! Request extractors whose rejections render as [`ApiError`] bodies, so a
//! malformed id or payload gets the same `{"error","kind"}` shape as every
//! other failure.

use axum::extract::{FromRequest, FromRequestParts, Json, Path, Query};

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);
