//! Mapbook HTTP server: configuration, authentication and the top-level
//! router wrapped around [`mapbook_api`].

pub mod auth;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use mapbook_api::{ApiState, ReportHub, api_router};
use mapbook_core::store::ReportStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{UserConfig, authenticate};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MAPBOOK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  /// Seconds a live stream may stay quiet before it is recycled.
  #[serde(default = "default_stream_idle_secs")]
  pub stream_idle_secs: u64,
  #[serde(default)]
  pub users:            Vec<UserConfig>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/mapbook/mapbook.db") }

fn default_stream_idle_secs() -> u64 { 10 }

impl ServerConfig {
  pub fn stream_idle(&self) -> Duration { Duration::from_secs(self.stream_idle_secs) }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the server needs to build its router.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub hub:    Arc<ReportHub>,
  pub config: Arc<ServerConfig>,
}

impl<S: ReportStore> AppState<S> {
  /// One hub per process; every stream and mutation shares it.
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self {
      store:  Arc::new(store),
      hub:    Arc::new(ReportHub::new()),
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete axum [`Router`]: the API behind Basic auth, traced.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ReportStore + Clone + 'static,
{
  let api = ApiState::new(state.store, state.hub).with_stream_idle(state.config.stream_idle());
  let users: Arc<[UserConfig]> = Arc::from(state.config.users.clone());

  api_router(api)
    .layer(middleware::from_fn_with_state(users, authenticate))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use mapbook_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use tower::ServiceExt as _;

  use super::*;

  async fn make_state() -> AppState<SqliteStore> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(b"secret", &salt)
      .unwrap()
      .to_string();
    let config = ServerConfig {
      host:             "127.0.0.1".to_string(),
      port:             0,
      store_path:       PathBuf::from(":memory:"),
      stream_idle_secs: 1,
      users:            vec![UserConfig {
        email:         "alice@example.com".to_string(),
        password_hash: hash,
      }],
    };
    AppState::new(SqliteStore::open_in_memory().await.unwrap(), config)
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn config_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .set_override("port", 9000)
      .unwrap()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.stream_idle(), Duration::from_secs(10));
    assert!(cfg.users.is_empty());
  }

  #[tokio::test]
  async fn authenticated_create_report() {
    let state = make_state().await;
    let req = Request::builder()
      .method("POST")
      .uri("/reports")
      .header(header::AUTHORIZATION, basic("alice@example.com", "secret"))
      .body(Body::empty())
      .unwrap();
    let res = router(state).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["title"], "Untitled");
    assert_eq!(report["can_write"], true);
  }

  #[tokio::test]
  async fn anonymous_request_is_unauthorized() {
    let state = make_state().await;
    let req = Request::builder().uri("/reports").body(Body::empty()).unwrap();
    let res = router(state).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }
}
