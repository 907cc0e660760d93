//! Invitation API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{respond, ApiResult};
use crate::auth::CurrentUser;
use crate::models::{
    CreateInvitationRequest, Invitation, InvitationListParams, Page, PaginationParams, TeamMember,
};
use crate::AppState;

/// GET /api/teams/{id}/invitations - Optional `status` filter.
pub async fn list_team_invitations(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(team_id): Path<String>,
    Query(params): Query<InvitationListParams>,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Page<Invitation>> {
    respond(
        state
            .services
            .list_team_invitations(&actor, &team_id, &params, &page)
            .await,
    )
}

/// POST /api/teams/{id}/invitations - Invite an email address.
pub async fn create_invitation(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(team_id): Path<String>,
    Json(request): Json<CreateInvitationRequest>,
) -> ApiResult<Invitation> {
    respond(state.services.invite_to_team(&actor, &team_id, request).await)
}

/// GET /api/invitations - Invitations addressed to the caller.
pub async fn list_my_invitations(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<InvitationListParams>,
    Query(page): Query<PaginationParams>,
) -> ApiResult<Page<Invitation>> {
    respond(state.services.list_my_invitations(&actor, &params, &page).await)
}

/// POST /api/invitations/{id}/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<TeamMember> {
    respond(state.services.accept_invitation(&actor, &id).await)
}

/// POST /api/invitations/{id}/reject
pub async fn reject_invitation(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Invitation> {
    respond(state.services.reject_invitation(&actor, &id).await)
}

/// DELETE /api/invitations/{id} - Withdraw a pending invitation.
pub async fn cancel_invitation(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    respond(state.services.cancel_invitation(&actor, &id).await)
}
