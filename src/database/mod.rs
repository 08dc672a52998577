pub mod manager;
pub mod models;
pub mod repository;
pub mod retry;

pub use manager::{DatabaseError, DatabaseManager, DbErrorKind};
pub use retry::{retry_transient, RetryError, RetryPolicy, Transient};
