pub mod queries;
pub mod reports;
pub mod stream;
