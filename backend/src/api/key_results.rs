//! Key result API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{respond, ApiResult};
use crate::auth::CurrentUser;
use crate::models::{
    CreateKeyResultRequest, KeyResult, UpdateKeyResultRequest, UpdateProgressRequest,
};
use crate::AppState;

/// GET /api/okrs/{id}/key-results
pub async fn list_key_results(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(okr_id): Path<String>,
) -> ApiResult<Vec<KeyResult>> {
    respond(state.services.list_key_results(&actor, &okr_id).await)
}

/// POST /api/okrs/{id}/key-results
pub async fn create_key_result(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(okr_id): Path<String>,
    Json(request): Json<CreateKeyResultRequest>,
) -> ApiResult<KeyResult> {
    respond(state.services.create_key_result(&actor, &okr_id, request).await)
}

/// PUT /api/key-results/{id}
pub async fn update_key_result(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateKeyResultRequest>,
) -> ApiResult<KeyResult> {
    respond(state.services.update_key_result(&actor, &id, request).await)
}

/// PUT /api/key-results/{id}/progress
pub async fn update_progress(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateProgressRequest>,
) -> ApiResult<KeyResult> {
    respond(
        state
            .services
            .update_key_result_progress(&actor, &id, request)
            .await,
    )
}

/// DELETE /api/key-results/{id}
pub async fn delete_key_result(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    respond(state.services.delete_key_result(&actor, &id).await)
}
