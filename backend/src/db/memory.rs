//! In-memory implementation of every repository port.
//!
//! All state sits behind one mutex, so each call is atomic with respect to
//! the others; this is what gives the uniqueness and status-guard contracts
//! the same race behavior as the SQLite schema.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::ports::*;
use super::timestamp;
use crate::auth::SessionStore;
use crate::errors::RepositoryError;
use crate::models::{
    Invitation, InvitationFilter, InvitationStatus, KeyResult, KeyResultChanges, NewInvitation,
    NewKeyResult, NewOkr, NewReview, NewTeam, NewUser, Okr, OkrChanges, OkrFilter, OrderBy, Page,
    Pagination, Review, ReviewChanges, Session, SortOrder, Team, TeamChanges, TeamMember,
    TeamRole, User,
};

#[derive(Default)]
struct State {
    users: Vec<User>,
    sessions: Vec<Session>,
    teams: Vec<Team>,
    members: Vec<TeamMember>,
    invitations: Vec<Invitation>,
    okrs: Vec<Okr>,
    key_results: Vec<KeyResult>,
    reviews: Vec<Review>,
    /// Operation names that fail once on their next call
    failures: HashSet<&'static str>,
}

impl State {
    fn check_failure(&mut self, operation: &'static str) -> RepoResult<()> {
        if self.failures.remove(operation) {
            return Err(RepositoryError::Storage(format!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(())
    }
}

/// An in-memory store implementing all repository ports.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Storage("memory store lock poisoned".to_string()))
    }

    /// Make the next call of `operation` (e.g. `"create_key_result"`) fail.
    #[cfg(test)]
    pub fn fail_next(&self, operation: &'static str) {
        self.state
            .lock()
            .expect("memory store lock poisoned")
            .failures
            .insert(operation);
    }
}

trait Timestamped {
    fn created_at(&self) -> &str;
    fn updated_at(&self) -> &str;
}

macro_rules! timestamped {
    ($($ty:ty),*) => {
        $(impl Timestamped for $ty {
            fn created_at(&self) -> &str {
                &self.created_at
            }
            fn updated_at(&self) -> &str {
                &self.updated_at
            }
        })*
    };
}

timestamped!(Team, Invitation, Okr, Review);

/// Sort and slice. Ties keep insertion order, reversed for descending
/// sorts, matching `rowid` ordering in SQLite.
fn paginate<T: Timestamped>(mut items: Vec<T>, pagination: &Pagination) -> Page<T> {
    if pagination.order == SortOrder::Desc {
        items.reverse();
    }
    items.sort_by(|a, b| {
        let ordering = match pagination.order_by {
            OrderBy::CreatedAt => a.created_at().cmp(b.created_at()),
            OrderBy::UpdatedAt => a.updated_at().cmp(b.updated_at()),
        };
        match pagination.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    pagination.apply(items)
}

// ==================== USER OPERATIONS ====================

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut state = self.lock()?;
        state.check_failure("create_user")?;
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(
                "UNIQUE constraint failed: users.email".to_string(),
            ));
        }

        let now = timestamp();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now.clone(),
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user_name(&self, id: &str, name: &str) -> RepoResult<Option<User>> {
        let mut state = self.lock()?;
        let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.name = name.to_string();
        user.updated_at = timestamp();
        Ok(Some(user.clone()))
    }
}

// ==================== SESSION OPERATIONS ====================

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: Session) -> RepoResult<Session> {
        let mut state = self.lock()?;
        let now = timestamp();
        state.sessions.retain(|s| s.expires_at > now);
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn get_session(&self, token: &str) -> RepoResult<Option<Session>> {
        let state = self.lock()?;
        Ok(state.sessions.iter().find(|s| s.token == token).cloned())
    }

    async fn revoke_session(&self, token: &str) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.sessions.len();
        state.sessions.retain(|s| s.token != token);
        Ok(state.sessions.len() < before)
    }
}

// ==================== TEAM OPERATIONS ====================

#[async_trait]
impl TeamRepository for MemoryStore {
    async fn create_team(&self, team: NewTeam) -> RepoResult<Team> {
        let mut state = self.lock()?;
        state.check_failure("create_team")?;

        let now = timestamp();
        let team = Team {
            id: uuid::Uuid::new_v4().to_string(),
            name: team.name,
            description: team.description,
            review_frequency: team.review_frequency,
            created_at: now.clone(),
            updated_at: now,
        };
        state.teams.push(team.clone());
        Ok(team)
    }

    async fn get_team(&self, id: &str) -> RepoResult<Option<Team>> {
        let state = self.lock()?;
        Ok(state.teams.iter().find(|t| t.id == id).cloned())
    }

    async fn update_team(&self, id: &str, changes: &TeamChanges) -> RepoResult<Option<Team>> {
        let mut state = self.lock()?;
        let Some(team) = state.teams.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            team.name = name.clone();
        }
        if let Some(description) = &changes.description {
            team.description = description.clone();
        }
        if let Some(frequency) = changes.review_frequency {
            team.review_frequency = frequency;
        }
        team.updated_at = timestamp();
        Ok(Some(team.clone()))
    }

    async fn delete_team(&self, id: &str) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.teams.len();
        state.teams.retain(|t| t.id != id);
        if state.teams.len() == before {
            return Ok(false);
        }

        state.members.retain(|m| m.team_id != id);
        state.invitations.retain(|i| i.team_id != id);
        let okr_ids: HashSet<String> = state
            .okrs
            .iter()
            .filter(|o| o.team_id == id)
            .map(|o| o.id.clone())
            .collect();
        state.okrs.retain(|o| o.team_id != id);
        state.key_results.retain(|k| !okr_ids.contains(&k.okr_id));
        state.reviews.retain(|r| !okr_ids.contains(&r.okr_id));
        Ok(true)
    }

    async fn list_teams_for_user(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> RepoResult<Page<Team>> {
        let state = self.lock()?;
        let team_ids: HashSet<&str> = state
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.team_id.as_str())
            .collect();
        let teams = state
            .teams
            .iter()
            .filter(|t| team_ids.contains(t.id.as_str()))
            .cloned()
            .collect();
        Ok(paginate(teams, pagination))
    }
}

// ==================== MEMBERSHIP OPERATIONS ====================

#[async_trait]
impl TeamMemberRepository for MemoryStore {
    async fn add_member(&self, member: TeamMember) -> RepoResult<TeamMember> {
        let mut state = self.lock()?;
        state.check_failure("add_member")?;
        if state
            .members
            .iter()
            .any(|m| m.team_id == member.team_id && m.user_id == member.user_id)
        {
            return Err(RepositoryError::Conflict(
                "UNIQUE constraint failed: team_members.team_id, team_members.user_id"
                    .to_string(),
            ));
        }
        state.members.push(member.clone());
        Ok(member)
    }

    async fn get_member(&self, team_id: &str, user_id: &str) -> RepoResult<Option<TeamMember>> {
        let state = self.lock()?;
        Ok(state
            .members
            .iter()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
            .cloned())
    }

    async fn update_member_role(
        &self,
        team_id: &str,
        user_id: &str,
        role: TeamRole,
    ) -> RepoResult<Option<TeamMember>> {
        let mut state = self.lock()?;
        let Some(member) = state
            .members
            .iter_mut()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
        else {
            return Ok(None);
        };
        member.role = role;
        Ok(Some(member.clone()))
    }

    async fn remove_member(&self, team_id: &str, user_id: &str) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.members.len();
        state
            .members
            .retain(|m| !(m.team_id == team_id && m.user_id == user_id));
        Ok(state.members.len() < before)
    }

    async fn list_members(&self, team_id: &str) -> RepoResult<Vec<TeamMember>> {
        let state = self.lock()?;
        Ok(state
            .members
            .iter()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect())
    }
}

// ==================== INVITATION OPERATIONS ====================

#[async_trait]
impl InvitationRepository for MemoryStore {
    async fn create_invitation(&self, invitation: NewInvitation) -> RepoResult<Invitation> {
        let mut state = self.lock()?;
        state.check_failure("create_invitation")?;
        if state.invitations.iter().any(|i| {
            i.team_id == invitation.team_id
                && i.invited_email == invitation.invited_email
                && i.status == InvitationStatus::Pending
        }) {
            return Err(RepositoryError::Conflict(
                "UNIQUE constraint failed: invitations.team_id, invitations.invited_email"
                    .to_string(),
            ));
        }

        let now = timestamp();
        let invitation = Invitation {
            id: uuid::Uuid::new_v4().to_string(),
            team_id: invitation.team_id,
            invited_email: invitation.invited_email,
            invited_by_id: invitation.invited_by_id,
            role: invitation.role,
            status: InvitationStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        };
        state.invitations.push(invitation.clone());
        Ok(invitation)
    }

    async fn get_invitation(&self, id: &str) -> RepoResult<Option<Invitation>> {
        let state = self.lock()?;
        Ok(state.invitations.iter().find(|i| i.id == id).cloned())
    }

    async fn transition_invitation(
        &self,
        id: &str,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> RepoResult<Option<Invitation>> {
        let mut state = self.lock()?;
        state.check_failure("transition_invitation")?;
        let Some(invitation) = state
            .invitations
            .iter_mut()
            .find(|i| i.id == id && i.status == from)
        else {
            return Ok(None);
        };
        invitation.status = to;
        invitation.updated_at = timestamp();
        Ok(Some(invitation.clone()))
    }

    async fn delete_invitation(&self, id: &str) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.invitations.len();
        state.invitations.retain(|i| i.id != id);
        Ok(state.invitations.len() < before)
    }

    async fn list_invitations(
        &self,
        filter: &InvitationFilter,
        pagination: &Pagination,
    ) -> RepoResult<Page<Invitation>> {
        let state = self.lock()?;
        let invitations = state
            .invitations
            .iter()
            .filter(|i| filter.team_id.as_ref().map_or(true, |t| &i.team_id == t))
            .filter(|i| {
                filter
                    .invited_email
                    .as_ref()
                    .map_or(true, |e| &i.invited_email == e)
            })
            .filter(|i| filter.status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        Ok(paginate(invitations, pagination))
    }
}

// ==================== OKR OPERATIONS ====================

#[async_trait]
impl OkrRepository for MemoryStore {
    async fn create_okr(&self, okr: NewOkr) -> RepoResult<Okr> {
        let mut state = self.lock()?;
        state.check_failure("create_okr")?;

        let now = timestamp();
        let okr = Okr {
            id: uuid::Uuid::new_v4().to_string(),
            title: okr.title,
            description: okr.description,
            okr_type: okr.okr_type,
            team_id: okr.team_id,
            owner_id: okr.owner_id,
            year: okr.year,
            quarter: okr.quarter,
            created_at: now.clone(),
            updated_at: now,
        };
        state.okrs.push(okr.clone());
        Ok(okr)
    }

    async fn get_okr(&self, id: &str) -> RepoResult<Option<Okr>> {
        let state = self.lock()?;
        Ok(state.okrs.iter().find(|o| o.id == id).cloned())
    }

    async fn update_okr(&self, id: &str, changes: &OkrChanges) -> RepoResult<Option<Okr>> {
        let mut state = self.lock()?;
        let Some(okr) = state.okrs.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            okr.title = title.clone();
        }
        if let Some(description) = &changes.description {
            okr.description = description.clone();
        }
        if let Some(year) = changes.year {
            okr.year = year;
        }
        if let Some(quarter) = changes.quarter {
            okr.quarter = quarter;
        }
        okr.updated_at = timestamp();
        Ok(Some(okr.clone()))
    }

    async fn delete_okr(&self, id: &str) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.okrs.len();
        state.okrs.retain(|o| o.id != id);
        if state.okrs.len() == before {
            return Ok(false);
        }
        state.key_results.retain(|k| k.okr_id != id);
        state.reviews.retain(|r| r.okr_id != id);
        Ok(true)
    }

    async fn list_okrs(&self, filter: &OkrFilter, pagination: &Pagination) -> RepoResult<Page<Okr>> {
        let state = self.lock()?;
        let okrs = state
            .okrs
            .iter()
            .filter(|o| filter.team_id.as_ref().map_or(true, |t| &o.team_id == t))
            .filter(|o| {
                filter
                    .owner_id
                    .as_ref()
                    .map_or(true, |owner| o.owner_id.as_ref() == Some(owner))
            })
            .filter(|o| filter.okr_type.map_or(true, |t| o.okr_type == t))
            .filter(|o| filter.year.map_or(true, |y| o.year == y))
            .filter(|o| filter.quarter.map_or(true, |q| o.quarter == q))
            .cloned()
            .collect();
        Ok(paginate(okrs, pagination))
    }
}

// ==================== KEY RESULT OPERATIONS ====================

#[async_trait]
impl KeyResultRepository for MemoryStore {
    async fn create_key_result(
        &self,
        okr_id: &str,
        key_result: NewKeyResult,
        max_per_okr: usize,
    ) -> RepoResult<KeyResult> {
        let mut state = self.lock()?;
        state.check_failure("create_key_result")?;
        if !state.okrs.iter().any(|o| o.id == okr_id) {
            return Err(RepositoryError::Storage(
                "FOREIGN KEY constraint failed".to_string(),
            ));
        }
        let held = state.key_results.iter().filter(|k| k.okr_id == okr_id).count();
        if held >= max_per_okr {
            return Err(RepositoryError::Conflict(format!(
                "okr {} already holds {} key results",
                okr_id, held
            )));
        }

        let now = timestamp();
        let key_result = KeyResult {
            id: uuid::Uuid::new_v4().to_string(),
            okr_id: okr_id.to_string(),
            title: key_result.title,
            target_value: key_result.target_value,
            current_value: key_result.current_value,
            unit: key_result.unit,
            created_at: now.clone(),
            updated_at: now,
        };
        state.key_results.push(key_result.clone());
        Ok(key_result)
    }

    async fn get_key_result(&self, id: &str) -> RepoResult<Option<KeyResult>> {
        let state = self.lock()?;
        Ok(state.key_results.iter().find(|k| k.id == id).cloned())
    }

    async fn update_key_result(
        &self,
        id: &str,
        changes: &KeyResultChanges,
    ) -> RepoResult<Option<KeyResult>> {
        let mut state = self.lock()?;
        state.check_failure("update_key_result")?;
        let Some(key_result) = state.key_results.iter_mut().find(|k| k.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            key_result.title = title.clone();
        }
        if let Some(target) = changes.target_value {
            key_result.target_value = target;
        }
        if let Some(current) = changes.current_value {
            key_result.current_value = current;
        }
        if let Some(unit) = &changes.unit {
            key_result.unit = unit.clone();
        }
        key_result.updated_at = timestamp();
        Ok(Some(key_result.clone()))
    }

    async fn delete_key_result(&self, id: &str) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.key_results.len();
        state.key_results.retain(|k| k.id != id);
        Ok(state.key_results.len() < before)
    }

    async fn list_key_results(&self, okr_id: &str) -> RepoResult<Vec<KeyResult>> {
        let state = self.lock()?;
        Ok(state
            .key_results
            .iter()
            .filter(|k| k.okr_id == okr_id)
            .cloned()
            .collect())
    }
}

// ==================== REVIEW OPERATIONS ====================

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn create_review(&self, review: NewReview) -> RepoResult<Review> {
        let mut state = self.lock()?;
        state.check_failure("create_review")?;

        let now = timestamp();
        let review = Review {
            id: uuid::Uuid::new_v4().to_string(),
            okr_id: review.okr_id,
            review_type: review.review_type,
            content: review.content,
            reviewer_id: review.reviewer_id,
            created_at: now.clone(),
            updated_at: now,
        };
        state.reviews.push(review.clone());
        Ok(review)
    }

    async fn get_review(&self, id: &str) -> RepoResult<Option<Review>> {
        let state = self.lock()?;
        Ok(state.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn update_review(&self, id: &str, changes: &ReviewChanges) -> RepoResult<Option<Review>> {
        let mut state = self.lock()?;
        let Some(review) = state.reviews.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(review_type) = changes.review_type {
            review.review_type = review_type;
        }
        if let Some(content) = &changes.content {
            review.content = content.clone();
        }
        review.updated_at = timestamp();
        Ok(Some(review.clone()))
    }

    async fn delete_review(&self, id: &str) -> RepoResult<bool> {
        let mut state = self.lock()?;
        let before = state.reviews.len();
        state.reviews.retain(|r| r.id != id);
        Ok(state.reviews.len() < before)
    }

    async fn list_reviews(&self, okr_id: &str, pagination: &Pagination) -> RepoResult<Page<Review>> {
        let state = self.lock()?;
        let reviews = state
            .reviews
            .iter()
            .filter(|r| r.okr_id == okr_id)
            .cloned()
            .collect();
        Ok(paginate(reviews, pagination))
    }
}
