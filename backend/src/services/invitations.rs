//! Invitation lifecycle: pending, then accepted or rejected exactly once.
//!
//! Concurrent accepts of the same invitation race on two storage guards: the
//! unique (team, user) membership key and the conditional status update.
//! Whichever request loses either sees "User is already a team member" or
//! "Invitation is not pending".

use tracing::{info, instrument, warn};

use super::{conflict_or, path_id, Services};
use crate::db::timestamp;
use crate::errors::{AppError, RepoContext};
use crate::models::{
    Actor, CreateInvitationRequest, Invitation, InvitationFilter, InvitationListParams,
    InvitationStatus, NewInvitation, Page, Pagination, PaginationParams, TeamMember,
};
use crate::policy::{Action, TeamAction};
use crate::validation;

pub const ALREADY_MEMBER: &str = "User is already a team member";
pub const PENDING_EXISTS: &str = "A pending invitation already exists for this email";
pub const NOT_PENDING: &str = "Invitation is not pending";
pub const WRONG_RECIPIENT: &str = "This invitation was sent to a different email address";

impl Services {
    #[instrument(skip_all, fields(user_id = %actor.user_id, team_id = %team_id))]
    pub async fn invite_to_team(
        &self,
        actor: &Actor,
        team_id: &str,
        request: CreateInvitationRequest,
    ) -> Result<Invitation, AppError> {
        let team_id = path_id("Team id", team_id)?;
        let (email, role) = validation::create_invitation(&request)?;
        self.load_team(&team_id).await?;
        self.authorize(actor, &team_id, Action::Manage(TeamAction::Invite))
            .await?;

        let existing_user = self
            .repos
            .users
            .get_user_by_email(&email)
            .await
            .context("Failed to look up user")?;
        if let Some(user) = existing_user {
            if self.role_in(&team_id, &user.id).await?.is_some() {
                return Err(AppError::Conflict(ALREADY_MEMBER.to_string()));
            }
        }

        let pending = self
            .repos
            .invitations
            .list_invitations(
                &InvitationFilter {
                    team_id: Some(team_id.clone()),
                    invited_email: Some(email.clone()),
                    status: Some(InvitationStatus::Pending),
                },
                &Pagination {
                    limit: 1,
                    ..Pagination::default()
                },
            )
            .await
            .context("Failed to check pending invitations")?;
        if pending.total > 0 {
            return Err(AppError::Conflict(PENDING_EXISTS.to_string()));
        }

        let invitation = conflict_or(
            self.repos
                .invitations
                .create_invitation(NewInvitation {
                    team_id,
                    invited_email: email,
                    invited_by_id: actor.user_id.clone(),
                    role,
                })
                .await,
            PENDING_EXISTS,
            "Failed to create invitation",
        )?;
        info!(invitation_id = %invitation.id, role = role.as_str(), "Invited to team");
        Ok(invitation)
    }

    async fn load_pending(&self, id: &str) -> Result<Invitation, AppError> {
        let id = path_id("Invitation id", id)?;
        let invitation = self.load_invitation(&id).await?;
        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::Conflict(NOT_PENDING.to_string()));
        }
        Ok(invitation)
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, invitation_id = %invitation_id))]
    pub async fn accept_invitation(
        &self,
        actor: &Actor,
        invitation_id: &str,
    ) -> Result<TeamMember, AppError> {
        let invitation = self.load_pending(invitation_id).await?;

        let user = self
            .repos
            .users
            .get_user(&actor.user_id)
            .await
            .context("Failed to load user")?
            .ok_or_else(|| AppError::not_found("User"))?;
        check_recipient(&invitation, &user.email)?;

        if self.role_in(&invitation.team_id, &user.id).await?.is_some() {
            return Err(AppError::Conflict(ALREADY_MEMBER.to_string()));
        }

        let member = conflict_or(
            self.repos
                .members
                .add_member(TeamMember {
                    team_id: invitation.team_id.clone(),
                    user_id: user.id.clone(),
                    role: invitation.role,
                    joined_at: timestamp(),
                })
                .await,
            ALREADY_MEMBER,
            "Failed to add team member",
        )?;

        let flipped = self
            .repos
            .invitations
            .transition_invitation(
                &invitation.id,
                InvitationStatus::Pending,
                InvitationStatus::Accepted,
            )
            .await
            .context("Failed to update invitation")?;
        if flipped.is_none() {
            // Settled elsewhere between our read and this update; undo the
            // membership so a rejected or cancelled invitation grants nothing.
            warn!("Invitation settled concurrently, removing membership");
            self.repos
                .members
                .remove_member(&member.team_id, &member.user_id)
                .await
                .context("Failed to remove team member")?;
            return Err(AppError::Conflict(NOT_PENDING.to_string()));
        }

        info!(team_id = %member.team_id, role = member.role.as_str(), "Accepted invitation");
        Ok(member)
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, invitation_id = %invitation_id))]
    pub async fn reject_invitation(
        &self,
        actor: &Actor,
        invitation_id: &str,
    ) -> Result<Invitation, AppError> {
        let invitation = self.load_pending(invitation_id).await?;
        check_recipient(&invitation, &actor.email)?;

        let rejected = self
            .repos
            .invitations
            .transition_invitation(
                &invitation.id,
                InvitationStatus::Pending,
                InvitationStatus::Rejected,
            )
            .await
            .context("Failed to update invitation")?
            .ok_or_else(|| AppError::Conflict(NOT_PENDING.to_string()))?;
        info!("Rejected invitation");
        Ok(rejected)
    }

    /// Withdraw a pending invitation. It is settled as rejected first, then
    /// removed; an accept that loses the status update drops its membership.
    #[instrument(skip_all, fields(user_id = %actor.user_id, invitation_id = %invitation_id))]
    pub async fn cancel_invitation(&self, actor: &Actor, invitation_id: &str) -> Result<(), AppError> {
        let id = path_id("Invitation id", invitation_id)?;
        let invitation = self.load_invitation(&id).await?;
        self.authorize(
            actor,
            &invitation.team_id,
            Action::Manage(TeamAction::CancelInvitation),
        )
        .await?;
        if invitation.status != InvitationStatus::Pending {
            return Err(AppError::Conflict(NOT_PENDING.to_string()));
        }

        self.repos
            .invitations
            .transition_invitation(&id, InvitationStatus::Pending, InvitationStatus::Rejected)
            .await
            .context("Failed to update invitation")?
            .ok_or_else(|| AppError::Conflict(NOT_PENDING.to_string()))?;
        self.repos
            .invitations
            .delete_invitation(&id)
            .await
            .context("Failed to delete invitation")?;
        info!(team_id = %invitation.team_id, "Cancelled invitation");
        Ok(())
    }

    pub async fn list_team_invitations(
        &self,
        actor: &Actor,
        team_id: &str,
        params: &InvitationListParams,
        page: &PaginationParams,
    ) -> Result<Page<Invitation>, AppError> {
        let team_id = path_id("Team id", team_id)?;
        let status = params
            .status
            .as_deref()
            .map(validation::invitation_status)
            .transpose()?;
        let pagination = validation::pagination(page)?;
        self.load_team(&team_id).await?;
        self.authorize(actor, &team_id, Action::View).await?;

        self.repos
            .invitations
            .list_invitations(
                &InvitationFilter {
                    team_id: Some(team_id),
                    invited_email: None,
                    status,
                },
                &pagination,
            )
            .await
            .context("Failed to list invitations")
    }

    /// Invitations addressed to the caller's email across all teams.
    pub async fn list_my_invitations(
        &self,
        actor: &Actor,
        params: &InvitationListParams,
        page: &PaginationParams,
    ) -> Result<Page<Invitation>, AppError> {
        let status = params
            .status
            .as_deref()
            .map(validation::invitation_status)
            .transpose()?;
        let pagination = validation::pagination(page)?;

        self.repos
            .invitations
            .list_invitations(
                &InvitationFilter {
                    team_id: None,
                    invited_email: Some(actor.email.clone()),
                    status,
                },
                &pagination,
            )
            .await
            .context("Failed to list invitations")
    }
}

/// Exact match, no case folding.
fn check_recipient(invitation: &Invitation, email: &str) -> Result<(), AppError> {
    if invitation.invited_email != email {
        return Err(AppError::Forbidden(WRONG_RECIPIENT.to_string()));
    }
    Ok(())
}
