//! HTTP Basic authentication in front of the API router.
//!
//! A valid `Authorization: Basic` pair becomes [`Claims`] in the request
//! extensions. A request with no credentials passes through untouched and is
//! rejected by the API's own extractor; a request with bad credentials is
//! answered with 401 here.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, HeaderValue, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use mapbook_api::ApiError;
use mapbook_core::claims::Claims;
use serde::Deserialize;

/// One account allowed to use this server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
  pub email:         String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Check the `Authorization` header against `users`.
///
/// `Ok(None)` means no credentials were offered.
pub fn verify_basic(
  headers: &HeaderMap,
  users:   &[UserConfig],
) -> Result<Option<Claims>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };

  let encoded = value
    .to_str()
    .ok()
    .and_then(|v| v.strip_prefix("Basic "))
    .ok_or(ApiError::Unauthenticated)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthenticated)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthenticated)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthenticated)?;

  let user = users
    .iter()
    .find(|u| u.email == email)
    .ok_or(ApiError::Unauthenticated)?;

  let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|e| {
    tracing::warn!(email, error = %e, "unparseable password hash in config");
    ApiError::Unauthenticated
  })?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthenticated)?;

  Ok(Some(Claims::new(email)))
}

/// Middleware: resolve the caller and attach their [`Claims`].
pub async fn authenticate(
  State(users): State<Arc<[UserConfig]>>,
  mut req: Request,
  next: Next,
) -> Response {
  match verify_basic(req.headers(), &users) {
    Ok(Some(claims)) => {
      req.extensions_mut().insert(claims);
    }
    Ok(None) => {}
    Err(e) => {
      tracing::debug!(uri = %req.uri(), "rejected credentials");
      let mut res = e.into_response();
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"mapbook\""),
      );
      return res;
    }
  }
  next.run(req).await
}

#[cfg(test)]
mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::get,
  };
  use mapbook_api::caller::Caller;
  use rand_core::OsRng;
  use tower::ServiceExt as _;

  use super::*;

  fn users(password: &str) -> Arc<[UserConfig]> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    Arc::from(vec![UserConfig {
      email:         "alice@example.com".to_string(),
      password_hash: hash,
    }])
  }

  fn basic(user: &str, pass: &str) -> String {
    let encoded = B64.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
  }

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
  }

  async fn whoami(Caller(claims): Caller) -> String { claims.email }

  fn app(users: Arc<[UserConfig]>) -> Router {
    Router::new()
      .route("/whoami", get(whoami))
      .layer(middleware::from_fn_with_state(users, authenticate))
  }

  #[test]
  fn correct_credentials() {
    let users = users("secret");
    let claims = verify_basic(&headers(&basic("alice@example.com", "secret")), &users)
      .unwrap()
      .unwrap();
    assert_eq!(claims.email, "alice@example.com");
  }

  #[test]
  fn wrong_password() {
    let users = users("secret");
    let res = verify_basic(&headers(&basic("alice@example.com", "wrong")), &users);
    assert!(matches!(res, Err(ApiError::Unauthenticated)));
  }

  #[test]
  fn unknown_user() {
    let users = users("secret");
    let res = verify_basic(&headers(&basic("mallory@example.com", "secret")), &users);
    assert!(matches!(res, Err(ApiError::Unauthenticated)));
  }

  #[test]
  fn missing_header_is_anonymous() {
    let users = users("secret");
    assert!(verify_basic(&HeaderMap::new(), &users).unwrap().is_none());
  }

  #[test]
  fn invalid_base64() {
    let users = users("secret");
    let res = verify_basic(&headers("Basic !!!not-base64!!!"), &users);
    assert!(matches!(res, Err(ApiError::Unauthenticated)));
  }

  #[tokio::test]
  async fn middleware_attaches_claims() {
    let req = Request::builder()
      .uri("/whoami")
      .header(header::AUTHORIZATION, basic("alice@example.com", "secret"))
      .body(Body::empty())
      .unwrap();
    let res = app(users("secret")).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"alice@example.com");
  }

  #[tokio::test]
  async fn middleware_rejects_bad_credentials_with_challenge() {
    let req = Request::builder()
      .uri("/whoami")
      .header(header::AUTHORIZATION, basic("alice@example.com", "wrong"))
      .body(Body::empty())
      .unwrap();
    let res = app(users("secret")).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn anonymous_request_is_rejected_by_handler() {
    let req = Request::builder().uri("/whoami").body(Body::empty()).unwrap();
    let res = app(users("secret")).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }
}
