//! Session port.

use async_trait::async_trait;

use crate::db::RepoResult;
use crate::models::Session;

/// Stores issued session tokens.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Also drops every session that has already expired.
    async fn create_session(&self, session: Session) -> RepoResult<Session>;
    /// Returns the session even if expired; callers check `expires_at`.
    async fn get_session(&self, token: &str) -> RepoResult<Option<Session>>;
    async fn revoke_session(&self, token: &str) -> RepoResult<bool>;
}
