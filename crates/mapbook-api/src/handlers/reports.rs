//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports` | The caller's active reports |
//! | `POST` | `/reports` | Empty body; returns 201 + report |
//! | `GET`  | `/reports/:id` | One snapshot; 404 if absent or archived |
//! | `PUT`  | `/reports/:id` | Body: [`UpdateBody`]; owner only |
//! | `POST` | `/reports/:id/archive` | Body: `{"archive":true}`; owner only |
//! | `POST` | `/reports/:id/fork` | Returns 201 + `{"report_id":...}` |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use mapbook_core::{
  report::{Report, ReportSnapshot, ReportUpdate},
  store::ReportStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, caller::Caller, error::ApiError, service::QueryEditRequest};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /reports`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Caller(claims): Caller,
) -> Result<Json<Vec<Report>>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  Ok(Json(state.service.list_reports(&claims).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /reports`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Caller(claims): Caller,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let report = state.service.create_report(&claims).await?;
  Ok((StatusCode::CREATED, Json(report)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /reports/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Caller(claims): Caller,
  Path(id): Path<String>,
) -> Result<Json<ReportSnapshot>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  Ok(Json(state.service.snapshot(&claims, &id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /reports/:id`.
#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub title:      String,
  #[serde(default)]
  pub map_config: String,
  /// Query text edits saved in the same transaction as the report.
  #[serde(default)]
  pub queries:    Vec<QueryEditRequest>,
}

/// `PUT /reports/:id`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Caller(claims): Caller,
  Path(id): Path<String>,
  body: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Json(body) = body?;
  let update = ReportUpdate {
    title:      body.title,
    map_config: body.map_config,
  };
  state
    .service
    .update_report(&claims, &id, update, body.queries)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Archive ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArchiveBody {
  pub archive: bool,
}

/// `POST /reports/:id/archive`; `{"archive":false}` restores.
pub async fn archive<S>(
  State(state): State<ApiState<S>>,
  Caller(claims): Caller,
  Path(id): Path<String>,
  body: Result<Json<ArchiveBody>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let Json(body) = body?;
  state
    .service
    .archive_report(&claims, &id, body.archive)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Fork ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ForkResponse {
  pub report_id: Uuid,
}

/// `POST /reports/:id/fork`
pub async fn fork<S>(
  State(state): State<ApiState<S>>,
  Caller(claims): Caller,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let fork = state.service.fork_report(&claims, &id).await?;
  Ok((StatusCode::CREATED, Json(ForkResponse { report_id: fork.id })))
}
