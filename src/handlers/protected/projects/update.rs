// handlers/protected/projects/update.rs - PUT /api/projects/:id handler

use axum::extract::{Extension, Multipart, Path, State};

use super::multipart::read_project_form;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::SubmissionReceipt;
use crate::AppState;

/// Partial update; any accepted edit sends the project back to `pending`
pub async fn project_update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<SubmissionReceipt> {
    let form = read_project_form(multipart).await?;
    let receipt = state
        .projects
        .update_project_with_files(project_id, &auth.actor(), form)
        .await?;
    Ok(ApiResponse::success(receipt))
}
