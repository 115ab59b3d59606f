//! Failures raised by [`SqliteStore`](crate::SqliteStore).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("sqlite: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A stored id column did not hold a UUID.
  #[error("corrupt id column: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored timestamp column did not hold RFC 3339 text.
  #[error("corrupt timestamp column: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
