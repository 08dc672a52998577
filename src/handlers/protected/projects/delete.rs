// handlers/protected/projects/delete.rs - DELETE /api/projects/:id handler

use axum::extract::{Extension, Path, State};
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::AppState;

pub async fn project_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<i64>,
) -> ApiResult<Value> {
    state.projects.delete_project(project_id, &auth.actor()).await?;
    Ok(ApiResponse::success(json!({ "id": project_id, "deleted": true })))
}
