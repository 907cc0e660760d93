//! Membership changes.

use tracing::{info, instrument};

use super::{path_id, Services};
use crate::errors::{AppError, RepoContext};
use crate::guard::{self, MembershipChange};
use crate::models::{Actor, TeamMember, UpdateMemberRoleRequest};
use crate::policy::{Action, TeamAction};
use crate::validation;

impl Services {
    pub async fn list_team_members(
        &self,
        actor: &Actor,
        team_id: &str,
    ) -> Result<Vec<TeamMember>, AppError> {
        let team_id = path_id("Team id", team_id)?;
        self.load_team(&team_id).await?;
        self.authorize(actor, &team_id, Action::View).await?;
        self.repos
            .members
            .list_members(&team_id)
            .await
            .context("Failed to list team members")
    }

    async fn load_member(&self, team_id: &str, user_id: &str) -> Result<TeamMember, AppError> {
        self.repos
            .members
            .get_member(team_id, user_id)
            .await
            .context("Failed to load team member")?
            .ok_or_else(|| AppError::not_found("Team member"))
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, team_id = %team_id, member_id = %member_id))]
    pub async fn remove_member_from_team(
        &self,
        actor: &Actor,
        team_id: &str,
        member_id: &str,
    ) -> Result<(), AppError> {
        let team_id = path_id("Team id", team_id)?;
        let member_id = path_id("User id", member_id)?;
        self.load_team(&team_id).await?;
        self.authorize(actor, &team_id, Action::Manage(TeamAction::RemoveMember))
            .await?;

        let target = self.load_member(&team_id, &member_id).await?;
        guard::ensure_admin_remains(
            self.repos.members.as_ref(),
            &actor.user_id,
            &target,
            MembershipChange::Remove,
        )
        .await?;

        self.repos
            .members
            .remove_member(&team_id, &member_id)
            .await
            .context("Failed to remove team member")?;
        info!("Removed team member");
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, team_id = %team_id, member_id = %member_id))]
    pub async fn update_member_role(
        &self,
        actor: &Actor,
        team_id: &str,
        member_id: &str,
        request: UpdateMemberRoleRequest,
    ) -> Result<TeamMember, AppError> {
        let team_id = path_id("Team id", team_id)?;
        let member_id = path_id("User id", member_id)?;
        let role = validation::role(&request.role)?;
        self.load_team(&team_id).await?;
        self.authorize(actor, &team_id, Action::Manage(TeamAction::ChangeRole))
            .await?;

        let target = self.load_member(&team_id, &member_id).await?;
        guard::ensure_admin_remains(
            self.repos.members.as_ref(),
            &actor.user_id,
            &target,
            MembershipChange::ChangeRole(role),
        )
        .await?;

        let member = self
            .repos
            .members
            .update_member_role(&team_id, &member_id, role)
            .await
            .context("Failed to update member role")?
            .ok_or_else(|| AppError::not_found("Team member"))?;
        info!(role = role.as_str(), "Updated member role");
        Ok(member)
    }
}
