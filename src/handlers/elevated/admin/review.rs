// handlers/elevated/admin/review.rs - POST /api/admin/projects/:id/review handler

use axum::extract::{Extension, Json, Path, State};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ReviewOutcome;
use crate::types::ProjectStatus;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
}

pub async fn project_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<i64>,
    Json(body): Json<ReviewRequest>,
) -> ApiResult<ReviewOutcome> {
    let status: ProjectStatus = body.status.trim().parse().map_err(|_| {
        let mut field_errors = std::collections::HashMap::new();
        field_errors.insert(
            "status".to_string(),
            "Status must be approved or rejected".to_string(),
        );
        ApiError::validation_error("Invalid review status", Some(field_errors))
    })?;

    let outcome = state
        .reviews
        .review_project(project_id, &auth.actor(), status, body.comment)
        .await?;
    Ok(ApiResponse::success(outcome))
}
