//! Repository ports, one per entity.
//!
//! Every call is an independent operation; there is no transaction spanning
//! two calls. Absence is `Ok(None)` (or `Ok(false)` for deletes), never an
//! error. Uniqueness violations surface as [`RepositoryError::Conflict`].

use async_trait::async_trait;

use crate::errors::RepositoryError;
use crate::models::{
    Invitation, InvitationFilter, InvitationStatus, KeyResult, KeyResultChanges, NewInvitation,
    NewKeyResult, NewOkr, NewReview, NewTeam, NewUser, Okr, OkrChanges, OkrFilter, Page,
    Pagination, Review, ReviewChanges, Team, TeamChanges, TeamMember, TeamRole, User,
};

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: &str) -> RepoResult<Option<User>>;
    /// Exact, case-sensitive lookup.
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn update_user_name(&self, id: &str, name: &str) -> RepoResult<Option<User>>;
}

#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn create_team(&self, team: NewTeam) -> RepoResult<Team>;
    async fn get_team(&self, id: &str) -> RepoResult<Option<Team>>;
    async fn update_team(&self, id: &str, changes: &TeamChanges) -> RepoResult<Option<Team>>;
    /// Cascades memberships, invitations and objectives.
    async fn delete_team(&self, id: &str) -> RepoResult<bool>;
    async fn list_teams_for_user(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> RepoResult<Page<Team>>;
}

#[async_trait]
pub trait TeamMemberRepository: Send + Sync {
    /// Fails with `Conflict` when (team_id, user_id) already exists.
    async fn add_member(&self, member: TeamMember) -> RepoResult<TeamMember>;
    async fn get_member(&self, team_id: &str, user_id: &str) -> RepoResult<Option<TeamMember>>;
    async fn update_member_role(
        &self,
        team_id: &str,
        user_id: &str,
        role: TeamRole,
    ) -> RepoResult<Option<TeamMember>>;
    async fn remove_member(&self, team_id: &str, user_id: &str) -> RepoResult<bool>;
    /// The complete member list, oldest first.
    async fn list_members(&self, team_id: &str) -> RepoResult<Vec<TeamMember>>;
}

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Fails with `Conflict` when a pending invitation exists for the same
    /// (team_id, invited_email).
    async fn create_invitation(&self, invitation: NewInvitation) -> RepoResult<Invitation>;
    async fn get_invitation(&self, id: &str) -> RepoResult<Option<Invitation>>;
    /// Compare-and-swap on status. Returns `None` when the invitation is
    /// missing or its status is no longer `from`.
    async fn transition_invitation(
        &self,
        id: &str,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> RepoResult<Option<Invitation>>;
    async fn delete_invitation(&self, id: &str) -> RepoResult<bool>;
    async fn list_invitations(
        &self,
        filter: &InvitationFilter,
        pagination: &Pagination,
    ) -> RepoResult<Page<Invitation>>;
}

#[async_trait]
pub trait OkrRepository: Send + Sync {
    async fn create_okr(&self, okr: NewOkr) -> RepoResult<Okr>;
    async fn get_okr(&self, id: &str) -> RepoResult<Option<Okr>>;
    async fn update_okr(&self, id: &str, changes: &OkrChanges) -> RepoResult<Option<Okr>>;
    /// Cascades key results and reviews.
    async fn delete_okr(&self, id: &str) -> RepoResult<bool>;
    async fn list_okrs(&self, filter: &OkrFilter, pagination: &Pagination)
        -> RepoResult<Page<Okr>>;
}

#[async_trait]
pub trait KeyResultRepository: Send + Sync {
    /// Fails with `Conflict` when the OKR already holds `max_per_okr` key
    /// results. The count and the insert happen in one step.
    async fn create_key_result(
        &self,
        okr_id: &str,
        key_result: NewKeyResult,
        max_per_okr: usize,
    ) -> RepoResult<KeyResult>;
    async fn get_key_result(&self, id: &str) -> RepoResult<Option<KeyResult>>;
    async fn update_key_result(
        &self,
        id: &str,
        changes: &KeyResultChanges,
    ) -> RepoResult<Option<KeyResult>>;
    async fn delete_key_result(&self, id: &str) -> RepoResult<bool>;
    /// All key results of an objective, oldest first.
    async fn list_key_results(&self, okr_id: &str) -> RepoResult<Vec<KeyResult>>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create_review(&self, review: NewReview) -> RepoResult<Review>;
    async fn get_review(&self, id: &str) -> RepoResult<Option<Review>>;
    async fn update_review(&self, id: &str, changes: &ReviewChanges)
        -> RepoResult<Option<Review>>;
    async fn delete_review(&self, id: &str) -> RepoResult<bool>;
    async fn list_reviews(&self, okr_id: &str, pagination: &Pagination)
        -> RepoResult<Page<Review>>;
}
