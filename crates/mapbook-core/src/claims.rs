//! Caller identity as resolved by the authentication layer.

use serde::{Deserialize, Serialize};

/// The authenticated caller of a request.
///
/// Ownership of reports is keyed by `email`; two claims with the same email
/// are the same caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub email: String,
}

impl Claims {
  pub fn new(email: impl Into<String>) -> Self { Self { email: email.into() } }
}
