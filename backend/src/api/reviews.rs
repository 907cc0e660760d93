//! Review API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{respond, ApiResult};
use crate::auth::CurrentUser;
use crate::models::{CreateReviewRequest, Page, PaginationParams, Review, UpdateReviewRequest};
use crate::AppState;

/// GET /api/okrs/{id}/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(okr_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Page<Review>> {
    respond(state.services.list_reviews(&actor, &okr_id, &params).await)
}

/// POST /api/okrs/{id}/reviews
pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(okr_id): Path<String>,
    Json(request): Json<CreateReviewRequest>,
) -> ApiResult<Review> {
    respond(state.services.create_review(&actor, &okr_id, request).await)
}

/// PUT /api/reviews/{id} - Reviewer only.
pub async fn update_review(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateReviewRequest>,
) -> ApiResult<Review> {
    respond(state.services.update_review(&actor, &id, request).await)
}

/// DELETE /api/reviews/{id} - Reviewer only.
pub async fn delete_review(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    respond(state.services.delete_review(&actor, &id).await)
}
