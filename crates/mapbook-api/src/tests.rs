//! Router tests driving the full API against an in-memory store.

use std::{sync::Arc, time::Duration};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use mapbook_core::{claims::Claims, report::ReportSnapshot};
use mapbook_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{ApiState, ReportHub, api_router};

const ALICE: &str = "alice@example.com";
const BOB: &str = "bob@example.com";

async fn make_state() -> ApiState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  ApiState::new(Arc::new(store), Arc::new(ReportHub::new()))
    .with_stream_idle(Duration::from_millis(200))
}

async fn call(
  state:  &ApiState<SqliteStore>,
  caller: Option<&str>,
  method: &str,
  uri:    &str,
  body:   Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if body.is_some() {
    builder = builder.header(header::CONTENT_TYPE, "application/json");
  }
  let mut req = builder
    .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
    .unwrap();
  if let Some(email) = caller {
    req.extensions_mut().insert(Claims::new(email));
  }
  api_router(state.clone()).oneshot(req).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn create_report(state: &ApiState<SqliteStore>, owner: &str) -> String {
  let resp = call(state, Some(owner), "POST", "/reports", None).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  json_body(resp).await["id"].as_str().unwrap().to_owned()
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn requests_without_claims_are_unauthenticated() {
  let state = make_state().await;
  let resp = call(&state, None, "POST", "/reports", None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(json_body(resp).await["code"], "unauthenticated");
}

// ── Reports ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn created_report_has_placeholder_fields() {
  let state = make_state().await;
  let id = create_report(&state, ALICE).await;

  let resp = call(&state, Some(ALICE), "GET", &format!("/reports/{id}"), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let snap: ReportSnapshot = serde_json::from_value(json_body(resp).await).unwrap();
  assert_eq!(snap.report.title, "Untitled");
  assert_eq!(snap.report.map_config, "");
  assert!(snap.report.can_write);
  assert!(snap.queries.is_empty());
}

#[tokio::test]
async fn malformed_report_id_is_invalid_argument() {
  let state = make_state().await;
  let resp = call(&state, Some(ALICE), "GET", "/reports/not-a-uuid", None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["code"], "invalid_argument");
}

#[tokio::test]
async fn update_without_title_is_invalid_argument() {
  let state = make_state().await;
  let id = create_report(&state, ALICE).await;
  let resp = call(
    &state,
    Some(ALICE),
    "PUT",
    &format!("/reports/{id}"),
    Some(json!({ "map_config": "{}" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_by_owner_then_list() {
  let state = make_state().await;
  let id = create_report(&state, ALICE).await;

  let resp = call(
    &state,
    Some(ALICE),
    "PUT",
    &format!("/reports/{id}"),
    Some(json!({ "title": "Ports", "map_config": "{\"zoom\":2}", "queries": [] })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let listed = json_body(call(&state, Some(ALICE), "GET", "/reports", None).await).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);
  assert_eq!(listed[0]["title"], "Ports");

  let others = json_body(call(&state, Some(BOB), "GET", "/reports", None).await).await;
  assert!(others.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn update_by_non_owner_is_not_found() {
  let state = make_state().await;
  let id = create_report(&state, ALICE).await;
  let resp = call(
    &state,
    Some(BOB),
    "PUT",
    &format!("/reports/{id}"),
    Some(json!({ "title": "mine" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json_body(resp).await["code"], "not_found");
}

#[tokio::test]
async fn archive_hides_report() {
  let state = make_state().await;
  let id = create_report(&state, ALICE).await;

  let resp = call(
    &state,
    Some(BOB),
    "POST",
    &format!("/reports/{id}/archive"),
    Some(json!({ "archive": true })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let resp = call(
    &state,
    Some(ALICE),
    "POST",
    &format!("/reports/{id}/archive"),
    Some(json!({ "archive": true })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = call(&state, Some(ALICE), "GET", &format!("/reports/{id}"), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let resp = call(&state, Some(ALICE), "GET", &format!("/reports/{id}/stream"), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fork_creates_report_for_caller() {
  let state = make_state().await;
  let id = create_report(&state, ALICE).await;
  call(
    &state,
    Some(ALICE),
    "PUT",
    &format!("/reports/{id}"),
    Some(json!({ "title": "T" })),
  )
  .await;
  call(
    &state,
    Some(ALICE),
    "POST",
    &format!("/reports/{id}/queries"),
    Some(json!({ "query_text": "SELECT 1" })),
  )
  .await;

  let resp = call(&state, Some(BOB), "POST", &format!("/reports/{id}/fork"), None).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let fork_id = json_body(resp).await["report_id"].as_str().unwrap().to_owned();
  assert_ne!(fork_id, id);

  let snap: ReportSnapshot = serde_json::from_value(
    json_body(call(&state, Some(BOB), "GET", &format!("/reports/{fork_id}"), None).await).await,
  )
  .unwrap();
  assert_eq!(snap.report.title, "Fork of T");
  assert!(snap.report.can_write);
  assert_eq!(snap.queries.len(), 1);
  assert_eq!(snap.queries[0].query_text, "SELECT 1");
}

// ── Queries ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_update_query() {
  let state = make_state().await;
  let id = create_report(&state, ALICE).await;

  let resp = call(
    &state,
    Some(ALICE),
    "POST",
    &format!("/reports/{id}/queries"),
    Some(json!({ "query_text": "SELECT 1" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let query_id = json_body(resp).await["id"].as_str().unwrap().to_owned();

  let resp = call(
    &state,
    Some(ALICE),
    "PUT",
    &format!("/queries/{query_id}"),
    Some(json!({ "query_text": "SELECT 2" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["report_id"], id.as_str());
  assert_eq!(body["query_text"], "SELECT 2");
}

#[tokio::test]
async fn update_unknown_query_is_not_found() {
  let state = make_state().await;
  let resp = call(
    &state,
    Some(ALICE),
    "PUT",
    &format!("/queries/{}", Uuid::new_v4()),
    Some(json!({ "query_text": "SELECT 2" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Stream ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn idle_stream_sends_one_snapshot_then_ends() {
  let state = make_state().await;
  let id = create_report(&state, ALICE).await;

  let resp = call(&state, Some(ALICE), "GET", &format!("/reports/{id}/stream"), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let ct = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
  assert!(ct.starts_with("text/event-stream"), "Content-Type: {ct}");

  // The body only completes once the idle timeout recycles the stream.
  let bytes = tokio::time::timeout(
    Duration::from_secs(5),
    axum::body::to_bytes(resp.into_body(), usize::MAX),
  )
  .await
  .unwrap()
  .unwrap();
  let text = std::str::from_utf8(&bytes).unwrap();
  assert_eq!(text.matches("event: snapshot").count(), 1, "body: {text}");
  assert!(!text.contains("event: error"), "body: {text}");
  assert!(text.contains(&id), "body: {text}");
}

#[tokio::test]
async fn stream_requires_claims() {
  let state = make_state().await;
  let id = create_report(&state, ALICE).await;
  let resp = call(&state, None, "GET", &format!("/reports/{id}/stream"), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
