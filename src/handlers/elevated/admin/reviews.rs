// handlers/elevated/admin/reviews.rs - GET /api/admin/projects/:id/reviews handler

use axum::extract::{Path, State};

use crate::database::models::ProjectReview;
use crate::middleware::{ApiResponse, ApiResult};
use crate::AppState;

pub async fn project_reviews(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> ApiResult<Vec<ProjectReview>> {
    let reviews = state.reviews.review_history(project_id).await?;
    Ok(ApiResponse::success(reviews))
}
