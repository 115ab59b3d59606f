//! Error types for `mapbook-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing {0}")]
  MissingIdentifier(&'static str),

  #[error("malformed {what} {value:?}: {source}")]
  MalformedIdentifier {
    what:   &'static str,
    value:  String,
    #[source]
    source: uuid::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
