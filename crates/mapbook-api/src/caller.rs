//! Caller identity extractor.
//!
//! Authentication itself happens outside this crate: whatever layer verifies
//! the request inserts a [`Claims`] into the request extensions. A request
//! without one is rejected as unauthenticated.

use axum::{extract::FromRequestParts, http::request::Parts};
use mapbook_core::claims::Claims;

use crate::error::ApiError;

/// The authenticated caller of a handler.
#[derive(Debug, Clone)]
pub struct Caller(pub Claims);

impl<St> FromRequestParts<St> for Caller
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Claims>()
      .cloned()
      .map(Caller)
      .ok_or(ApiError::Unauthenticated)
  }
}
