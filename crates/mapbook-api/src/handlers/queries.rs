//! Handlers for query endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/reports/:id/queries` | Body: `{"query_text":"..."}`; returns 201 + query |
//! | `PUT`  | `/queries/:id` | Body: `{"query_text":"..."}`; returns the query |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use mapbook_core::{report::Query, store::ReportStore};
use serde::Deserialize;

use crate::{ApiState, caller::Caller, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct QueryBody {
  pub query_text: String,
}

/// `POST /reports/:id/queries`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Caller(claims): Caller,
  Path(report_id): Path<String>,
  body: Result<Json<QueryBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Json(body) = body?;
  let query = state
    .service
    .create_query(&claims, &report_id, body.query_text)
    .await?;
  Ok((StatusCode::CREATED, Json(query)))
}

/// `PUT /queries/:id`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Caller(claims): Caller,
  Path(id): Path<String>,
  body: Result<Json<QueryBody>, JsonRejection>,
) -> Result<Json<Query>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Json(body) = body?;
  let query = state
    .service
    .update_query(&claims, &id, body.query_text)
    .await?;
  Ok(Json(query))
}
