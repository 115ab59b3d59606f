//! Domain model shared by every Mapbook crate.
//!
//! [`report`] holds reports, queries and the snapshot sent to live viewers;
//! [`claims`] is the caller identity; [`store::ReportStore`] is the seam that
//! storage backends implement. No HTTP and no SQL live here.

pub mod claims;
pub mod error;
pub mod report;
pub mod store;

pub use error::{Error, Result};
