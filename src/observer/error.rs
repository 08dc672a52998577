use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::services::notification::NotificationError;

/// Failures raised by post-commit observers. They are logged, never returned
/// to the request that triggered them.
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Timeout error: observer '{0}' exceeded its deadline")]
    Timeout(&'static str),

    #[error("System error: {0}")]
    System(String),
}
