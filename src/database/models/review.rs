use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::ProjectStatus;

/// Append-only record of one administrator decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProjectReview {
    pub id: i64,
    pub project_id: i64,
    pub admin_id: i64,
    #[sqlx(try_from = "String")]
    pub old_status: ProjectStatus,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// General change-history row written after a committed mutation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub entity: String,
    pub entity_id: i64,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub actor_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
