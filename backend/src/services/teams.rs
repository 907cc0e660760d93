//! Team lifecycle.

use tracing::{debug, info, instrument};

use super::{path_id, Services};
use crate::db::timestamp;
use crate::errors::{AppError, RepoContext};
use crate::guard;
use crate::models::{
    Actor, CreateTeamRequest, Page, PaginationParams, Team, TeamChanges, TeamMember, TeamRole,
    UpdateReviewFrequencyRequest, UpdateTeamRequest,
};
use crate::policy::{Action, TeamAction};
use crate::validation;

impl Services {
    /// Creates the team, then makes the creator its first admin.
    #[instrument(skip_all, fields(user_id = %actor.user_id))]
    pub async fn create_team(&self, actor: &Actor, request: CreateTeamRequest) -> Result<Team, AppError> {
        let new_team = validation::create_team(&request)?;

        let team = self
            .repos
            .teams
            .create_team(new_team)
            .await
            .context("Failed to create team")?;

        self.repos
            .members
            .add_member(TeamMember {
                team_id: team.id.clone(),
                user_id: actor.user_id.clone(),
                role: TeamRole::Admin,
                joined_at: timestamp(),
            })
            .await
            .context("Failed to add team admin")?;

        info!(team_id = %team.id, "Created team");
        Ok(team)
    }

    pub async fn get_team(&self, actor: &Actor, team_id: &str) -> Result<Team, AppError> {
        let team_id = path_id("Team id", team_id)?;
        let team = self.load_team(&team_id).await?;
        self.authorize(actor, &team.id, Action::View).await?;
        Ok(team)
    }

    pub async fn list_my_teams(
        &self,
        actor: &Actor,
        params: &PaginationParams,
    ) -> Result<Page<Team>, AppError> {
        let pagination = validation::pagination(params)?;
        let page = self
            .repos
            .teams
            .list_teams_for_user(&actor.user_id, &pagination)
            .await
            .context("Failed to list teams")?;
        debug!(user_id = %actor.user_id, total = page.total, "Listed teams");
        Ok(page)
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, team_id = %team_id))]
    pub async fn update_team(
        &self,
        actor: &Actor,
        team_id: &str,
        request: UpdateTeamRequest,
    ) -> Result<Team, AppError> {
        let team_id = path_id("Team id", team_id)?;
        let changes = validation::update_team(&request)?;
        self.load_team(&team_id).await?;
        self.authorize(actor, &team_id, Action::Manage(TeamAction::Update))
            .await?;

        let team = self
            .repos
            .teams
            .update_team(&team_id, &changes)
            .await
            .context("Failed to update team")?
            .ok_or_else(|| AppError::not_found("Team"))?;
        info!("Updated team");
        Ok(team)
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id, team_id = %team_id))]
    pub async fn update_team_review_frequency(
        &self,
        actor: &Actor,
        team_id: &str,
        request: UpdateReviewFrequencyRequest,
    ) -> Result<Team, AppError> {
        let team_id = path_id("Team id", team_id)?;
        let frequency = validation::review_frequency(&request.review_frequency)?;
        self.load_team(&team_id).await?;
        self.authorize(
            actor,
            &team_id,
            Action::Manage(TeamAction::ChangeReviewFrequency),
        )
        .await?;

        let changes = TeamChanges {
            review_frequency: Some(frequency),
            ..TeamChanges::default()
        };
        let team = self
            .repos
            .teams
            .update_team(&team_id, &changes)
            .await
            .context("Failed to update review frequency")?
            .ok_or_else(|| AppError::not_found("Team"))?;
        info!(frequency = frequency.as_str(), "Updated review frequency");
        Ok(team)
    }

    /// Only the last remaining member, an admin, may delete a team.
    #[instrument(skip_all, fields(user_id = %actor.user_id, team_id = %team_id))]
    pub async fn delete_team(&self, actor: &Actor, team_id: &str) -> Result<(), AppError> {
        let team_id = path_id("Team id", team_id)?;
        self.load_team(&team_id).await?;
        self.authorize(actor, &team_id, Action::Manage(TeamAction::Delete))
            .await?;
        guard::ensure_team_deletable(self.repos.members.as_ref(), &team_id).await?;

        self.repos
            .teams
            .delete_team(&team_id)
            .await
            .context("Failed to delete team")?;
        info!("Deleted team");
        Ok(())
    }
}
