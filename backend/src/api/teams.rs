//! Team API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{respond, ApiResult};
use crate::auth::CurrentUser;
use crate::models::{
    CreateTeamRequest, Okr, OkrListParams, Page, PaginationParams, Team,
    UpdateReviewFrequencyRequest, UpdateTeamRequest,
};
use crate::AppState;

/// GET /api/teams - Teams the caller belongs to.
pub async fn list_teams(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Page<Team>> {
    respond(state.services.list_my_teams(&actor, &params).await)
}

/// POST /api/teams - Create a team with the caller as admin.
pub async fn create_team(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<Team> {
    respond(state.services.create_team(&actor, request).await)
}

/// GET /api/teams/{id}
pub async fn get_team(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Team> {
    respond(state.services.get_team(&actor, &id).await)
}

/// PUT /api/teams/{id}
pub async fn update_team(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateTeamRequest>,
) -> ApiResult<Team> {
    respond(state.services.update_team(&actor, &id, request).await)
}

/// PUT /api/teams/{id}/review-frequency
pub async fn update_review_frequency(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateReviewFrequencyRequest>,
) -> ApiResult<Team> {
    respond(
        state
            .services
            .update_team_review_frequency(&actor, &id, request)
            .await,
    )
}

/// DELETE /api/teams/{id} - Only allowed once the admin is the last member.
pub async fn delete_team(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    respond(state.services.delete_team(&actor, &id).await)
}

/// GET /api/teams/{id}/okrs - Filter by ownerId, type, year, quarter.
pub async fn list_team_okrs(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<OkrListParams>,
) -> ApiResult<Page<Okr>> {
    respond(state.services.list_okrs(&actor, &id, &params).await)
}
