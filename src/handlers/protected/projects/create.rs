// handlers/protected/projects/create.rs - POST /api/users/:owner_id/projects handler

use axum::extract::{Extension, Multipart, Path, State};

use super::multipart::read_project_form;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::SubmissionReceipt;
use crate::AppState;

pub async fn project_create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(owner_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<SubmissionReceipt> {
    let form = read_project_form(multipart).await?;
    let receipt = state.projects.create_project(owner_id, &auth.actor(), form).await?;
    Ok(ApiResponse::created(receipt))
}
