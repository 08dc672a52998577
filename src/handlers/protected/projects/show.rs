// handlers/protected/projects/show.rs - GET /api/projects/:id handler

use axum::extract::{Extension, Path, State};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ProjectAggregate;
use crate::AppState;

pub async fn project_show(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<i64>,
) -> ApiResult<ProjectAggregate> {
    let project = state.projects.get_project(project_id, &auth.actor()).await?;
    Ok(ApiResponse::success(project))
}
