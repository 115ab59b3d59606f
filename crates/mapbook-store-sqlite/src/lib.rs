//! SQLite-backed [`ReportStore`](mapbook_core::store::ReportStore).
//!
//! One `tokio_rusqlite` connection thread owns the database file; reports
//! and queries are read and written through closures sent to it.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
