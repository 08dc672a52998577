use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::FileCategory;

/// One stored upload belonging to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProjectFile {
    pub id: i64,
    pub project_id: i64,
    #[sqlx(try_from = "String")]
    pub file_type: FileCategory,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}
