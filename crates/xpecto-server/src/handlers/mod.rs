//! Route handlers, one module per resource.

pub mod auth;
pub mod catalog;
pub mod leads;

use axum::extract::FromRequest;
use uuid::Uuid;

use crate::error::ApiError;

/// `axum::Json` whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Body<T>(pub T);

/// Parse a path id, answering 400 for anything that is not a UUID.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw).map_err(|_| ApiError::Validation("Invalid ID".into()))
}
