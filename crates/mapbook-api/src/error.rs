//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! The four variants are the whole failure taxonomy of the mutation and
//! streaming calls. Only [`ApiError::Internal`] is worth retrying.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

/// An error returned by an API handler or streaming session.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthenticated")]
  Unauthenticated,

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// The target is absent, archived, or not owned by the caller.
  #[error("not found: {0}")]
  NotFound(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Stable machine-readable name of the failure kind.
  pub fn code(&self) -> &'static str {
    match self {
      ApiError::Unauthenticated => "unauthenticated",
      ApiError::InvalidArgument(_) => "invalid_argument",
      ApiError::NotFound(_) => "not_found",
      ApiError::Internal(_) => "internal",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
      ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// JSON body shared by error responses and stream `error` events.
  pub fn body(&self) -> Value {
    json!({ "code": self.code(), "error": self.to_string() })
  }
}

impl From<mapbook_core::Error> for ApiError {
  fn from(e: mapbook_core::Error) -> Self { ApiError::InvalidArgument(e.to_string()) }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self { ApiError::InvalidArgument(e.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status(), Json(self.body())).into_response()
  }
}
