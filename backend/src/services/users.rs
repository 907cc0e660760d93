//! Accounts and sessions.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, instrument, warn};

use super::{conflict_or, Services};
use crate::errors::{AppError, RepoContext};
use crate::models::{
    Actor, NewUser, RegisterRequest, Session, SignInRequest, SignInResponse,
    UpdateProfileRequest, User,
};
use crate::validation;

const EMAIL_TAKEN: &str = "An account with this email already exists";
const BAD_CREDENTIALS: &str = "Invalid email or password";
const INVALID_SESSION: &str = "Invalid or expired session";

fn new_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

impl Services {
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register_user(&self, request: RegisterRequest) -> Result<User, AppError> {
        let registration = validation::register(&request)?;

        let existing = self
            .repos
            .users
            .get_user_by_email(&registration.email)
            .await
            .context("Failed to look up user")?;
        if existing.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password = registration.password;
        let password_hash = self
            .blocking_hasher(move |hasher| hasher.hash(&password))
            .await?;

        let user = conflict_or(
            self.repos
                .users
                .create_user(NewUser {
                    email: registration.email,
                    name: registration.name,
                    password_hash,
                })
                .await,
            EMAIL_TAKEN,
            "Failed to create user",
        )?;

        info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn sign_in(&self, request: SignInRequest) -> Result<SignInResponse, AppError> {
        let user = self
            .repos
            .users
            .get_user_by_email(request.email.trim())
            .await
            .context("Failed to look up user")?;
        let Some(user) = user else {
            // Unknown emails cost the same bcrypt work as a wrong password.
            let password = request.password;
            self.blocking_hasher(move |hasher| hasher.hash(&password))
                .await?;
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };

        let password = request.password;
        let hash = user.password_hash.clone();
        let verified = self
            .blocking_hasher(move |hasher| hasher.verify(&password, &hash))
            .await?;
        if !verified {
            warn!(user_id = %user.id, "Rejected sign-in with wrong password");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let expires_at = (Utc::now() + self.session_ttl).to_rfc3339_opts(SecondsFormat::Micros, true);
        let session = self
            .repos
            .sessions
            .create_session(Session {
                token: new_token(),
                user_id: user.id.clone(),
                expires_at,
            })
            .await
            .context("Failed to create session")?;

        info!(user_id = %user.id, "Signed in");
        Ok(SignInResponse {
            token: session.token,
            expires_at: session.expires_at,
            user,
        })
    }

    /// Revoking an unknown token is not an error.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        let revoked = self
            .repos
            .sessions
            .revoke_session(token)
            .await
            .context("Failed to revoke session")?;
        if revoked {
            info!("Signed out");
        }
        Ok(())
    }

    /// Resolve a bearer token to the acting user. Expired sessions are
    /// revoked on sight.
    pub async fn authenticate(&self, token: &str) -> Result<Actor, AppError> {
        let unauthorized = || AppError::Unauthorized(INVALID_SESSION.to_string());

        let session = self
            .repos
            .sessions
            .get_session(token)
            .await
            .context("Failed to load session")?
            .ok_or_else(unauthorized)?;

        let expired = DateTime::parse_from_rfc3339(&session.expires_at)
            .map(|at| at.with_timezone(&Utc) <= Utc::now())
            .unwrap_or(true);
        if expired {
            self.repos
                .sessions
                .revoke_session(token)
                .await
                .context("Failed to revoke session")?;
            return Err(unauthorized());
        }

        let user = self
            .repos
            .users
            .get_user(&session.user_id)
            .await
            .context("Failed to load user")?
            .ok_or_else(unauthorized)?;
        Ok(Actor::from(&user))
    }

    pub async fn current_user(&self, actor: &Actor) -> Result<User, AppError> {
        self.repos
            .users
            .get_user(&actor.user_id)
            .await
            .context("Failed to load user")?
            .ok_or_else(|| AppError::not_found("User"))
    }

    #[instrument(skip_all, fields(user_id = %actor.user_id))]
    pub async fn update_profile(
        &self,
        actor: &Actor,
        request: UpdateProfileRequest,
    ) -> Result<User, AppError> {
        let name = validation::user_name(&request.name)?;
        let user = self
            .repos
            .users
            .update_user_name(&actor.user_id, &name)
            .await
            .context("Failed to update profile")?
            .ok_or_else(|| AppError::not_found("User"))?;
        info!("Updated profile");
        Ok(user)
    }
}
