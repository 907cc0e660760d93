//! OKR API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{respond, ApiResult};
use crate::auth::CurrentUser;
use crate::models::{CreateOkrRequest, Okr, OkrWithKeyResults, UpdateOkrRequest};
use crate::AppState;

/// POST /api/okrs - Create an objective with its key results.
pub async fn create_okr(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(request): Json<CreateOkrRequest>,
) -> ApiResult<OkrWithKeyResults> {
    respond(state.services.create_okr(&actor, request).await)
}

/// GET /api/okrs/{id}
pub async fn get_okr(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<OkrWithKeyResults> {
    respond(state.services.get_okr(&actor, &id).await)
}

/// PUT /api/okrs/{id}
pub async fn update_okr(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateOkrRequest>,
) -> ApiResult<Okr> {
    respond(state.services.update_okr(&actor, &id, request).await)
}

/// DELETE /api/okrs/{id}
pub async fn delete_okr(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    respond(state.services.delete_okr(&actor, &id).await)
}
