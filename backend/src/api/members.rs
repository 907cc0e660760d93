//! Team member API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{respond, ApiResult};
use crate::auth::CurrentUser;
use crate::models::{TeamMember, UpdateMemberRoleRequest};
use crate::AppState;

/// GET /api/teams/{id}/members - List all members of a team.
pub async fn list_members(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(team_id): Path<String>,
) -> ApiResult<Vec<TeamMember>> {
    respond(state.services.list_team_members(&actor, &team_id).await)
}

/// PUT /api/teams/{id}/members/{user_id} - Change a member's role.
pub async fn update_member_role(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((team_id, user_id)): Path<(String, String)>,
    Json(request): Json<UpdateMemberRoleRequest>,
) -> ApiResult<TeamMember> {
    respond(
        state
            .services
            .update_member_role(&actor, &team_id, &user_id, request)
            .await,
    )
}

/// DELETE /api/teams/{id}/members/{user_id} - Remove a member.
pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((team_id, user_id)): Path<(String, String)>,
) -> ApiResult<()> {
    respond(
        state
            .services
            .remove_member_from_team(&actor, &team_id, &user_id)
            .await,
    )
}
