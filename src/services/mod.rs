pub mod file_binding;
pub mod notification;
pub mod payload;
pub mod project_service;
pub mod review_service;
pub mod storage;

use thiserror::Error;

use crate::database::manager::{DatabaseError, DbErrorKind};
use crate::database::retry::Transient;
use crate::types::Role;
use payload::FieldErrors;
use storage::StorageError;

pub use file_binding::{bind, classify, BindingTarget, BINDING_SLOTS};
pub use notification::{InboxDispatcher, Notification, NotificationDispatcher, WebhookDispatcher};
pub use payload::{IncomingFile, ProjectDraft, ProjectForm, ProjectPatch};
pub use project_service::{ProjectAggregate, ProjectWriteService, SubmissionReceipt};
pub use review_service::{ReviewOutcome, ReviewWorkflow};
pub use storage::{LocalStorage, StorageGateway, StorageUsage};

/// Caller identity as seen by the services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner of the resource, or an administrator acting on their behalf
    pub fn can_act_for(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// Failure taxonomy surfaced by the write and review services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("System busy after {attempts} attempts")]
    Busy { attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl ServiceError {
    pub fn field(name: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), message.to_string());
        ServiceError::Validation(errors)
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err.kind() {
            DbErrorKind::NotFound => ServiceError::NotFound(err.to_string()),
            DbErrorKind::ForeignKeyViolation => match err.constraint().and_then(user_reference) {
                Some(UserReference::Field(field)) => ServiceError::field(field, "Unknown user"),
                Some(UserReference::Reviewer) => {
                    ServiceError::Forbidden("Reviewing administrator does not exist".into())
                }
                None => ServiceError::Database(err),
            },
            _ => ServiceError::Database(err),
        }
    }
}

/// Caller-supplied user id behind a foreign-key violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserReference {
    Field(&'static str),
    Reviewer,
}

/// Map a violated constraint onto the user reference that caused it
fn user_reference(constraint: &str) -> Option<UserReference> {
    match constraint {
        "projects_owner_id_fkey" => Some(UserReference::Field("owner_id")),
        "project_groups_user_id_fkey" => Some(UserReference::Field("contributors")),
        "project_reviews_admin_id_fkey" => Some(UserReference::Reviewer),
        _ => None,
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

impl Transient for ServiceError {
    fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Database(e) if e.is_transient())
    }
}
