//! Lifecycle services.
//!
//! One method per use case. Each follows the same order: validate the input,
//! resolve the entities it names, ask the policy (and the membership guard
//! where the admin invariant is at stake), then write. Writes are separate
//! repository calls; when a later one fails the earlier ones stay committed.

mod invitations;
mod key_results;
mod members;
mod okrs;
mod reviews;
mod teams;
mod users;


use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use crate::auth::PasswordHasher;
use crate::db::{RepoResult, Repositories};
use crate::errors::{AppError, RepoContext, RepositoryError};
use crate::models::{Actor, Invitation, KeyResult, Okr, Review, Team, TeamRole};
use crate::policy::{self, Action, Subject};
use crate::validation;

/// Entry point for every operation the API exposes.
pub struct Services {
    repos: Repositories,
    hasher: Arc<dyn PasswordHasher>,
    session_ttl: Duration,
}

impl Services {
    pub fn new(repos: Repositories, hasher: Arc<dyn PasswordHasher>, session_ttl_hours: i64) -> Self {
        Self {
            repos,
            hasher,
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    /// The caller's role in a team, if any.
    async fn role_in(&self, team_id: &str, user_id: &str) -> Result<Option<TeamRole>, AppError> {
        Ok(self
            .repos
            .members
            .get_member(team_id, user_id)
            .await
            .context("Failed to load team membership")?
            .map(|m| m.role))
    }

    /// Evaluate the policy for `actor` within `team_id`.
    async fn authorize(&self, actor: &Actor, team_id: &str, action: Action<'_>) -> Result<(), AppError> {
        let role = self.role_in(team_id, &actor.user_id).await?;
        policy::authorize(&Subject::new(&actor.user_id, role), action)
            .into_result()
            .inspect_err(|e| {
                debug!(team_id, user_id = %actor.user_id, "Denied: {}", e.message());
            })
    }

    async fn load_team(&self, id: &str) -> Result<Team, AppError> {
        self.repos
            .teams
            .get_team(id)
            .await
            .context("Failed to load team")?
            .ok_or_else(|| AppError::not_found("Team"))
    }

    async fn load_okr(&self, id: &str) -> Result<Okr, AppError> {
        self.repos
            .okrs
            .get_okr(id)
            .await
            .context("Failed to load OKR")?
            .ok_or_else(|| AppError::not_found("OKR"))
    }

    async fn load_key_result(&self, id: &str) -> Result<KeyResult, AppError> {
        self.repos
            .key_results
            .get_key_result(id)
            .await
            .context("Failed to load key result")?
            .ok_or_else(|| AppError::not_found("Key result"))
    }

    async fn load_review(&self, id: &str) -> Result<Review, AppError> {
        self.repos
            .reviews
            .get_review(id)
            .await
            .context("Failed to load review")?
            .ok_or_else(|| AppError::not_found("Review"))
    }

    async fn load_invitation(&self, id: &str) -> Result<Invitation, AppError> {
        self.repos
            .invitations
            .get_invitation(id)
            .await
            .context("Failed to load invitation")?
            .ok_or_else(|| AppError::not_found("Invitation"))
    }

    /// Run the password hasher off the async runtime.
    async fn blocking_hasher<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn PasswordHasher) -> Result<T, AppError> + Send + 'static,
    {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || f(hasher.as_ref()))
            .await
            .map_err(|e| {
                tracing::error!("Password hashing task failed: {}", e);
                AppError::Internal("Failed to process password".to_string())
            })?
    }
}

/// Like [`RepoContext::context`], but a uniqueness violation becomes a
/// `Conflict` carrying `conflict`.
fn conflict_or<T>(result: RepoResult<T>, conflict: &str, failure: &str) -> Result<T, AppError> {
    match result {
        Err(RepositoryError::Conflict(cause)) => {
            debug!("{}: {}", conflict, cause);
            Err(AppError::Conflict(conflict.to_string()))
        }
        other => other.context(failure),
    }
}

/// Path identifiers are checked before anything is loaded.
fn path_id(field: &str, value: &str) -> Result<String, AppError> {
    validation::id(field, value)
}
