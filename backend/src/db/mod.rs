//! Persistence layer.
//!
//! The services only see the repository traits in [`ports`]. SQLite is the
//! production implementation; [`MemoryStore`] honors the same contracts and
//! backs tests and throwaway deployments.

mod memory;
mod ports;
mod sqlite;

pub use memory::MemoryStore;
pub use ports::*;
pub use sqlite::SqliteStore;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::auth::SessionStore;

/// Current time in the fixed-width RFC 3339 form stored in every table.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// One handle per repository port.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub teams: Arc<dyn TeamRepository>,
    pub members: Arc<dyn TeamMemberRepository>,
    pub invitations: Arc<dyn InvitationRepository>,
    pub okrs: Arc<dyn OkrRepository>,
    pub key_results: Arc<dyn KeyResultRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Repositories {
    /// Wire every port to a single store implementing all of them.
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserRepository
            + TeamRepository
            + TeamMemberRepository
            + InvitationRepository
            + OkrRepository
            + KeyResultRepository
            + ReviewRepository
            + SessionStore
            + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            teams: store.clone(),
            members: store.clone(),
            invitations: store.clone(),
            okrs: store.clone(),
            key_results: store.clone(),
            reviews: store.clone(),
            sessions: store,
        }
    }
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            review_frequency TEXT NOT NULL DEFAULT 'weekly',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // A second insert for the same (team, user) is a unique violation.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_members (
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            joined_at TEXT NOT NULL,
            PRIMARY KEY (team_id, user_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invitations (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            invited_email TEXT NOT NULL,
            invited_by_id TEXT NOT NULL,
            role TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_invitations_pending
            ON invitations(team_id, invited_email) WHERE status = 'pending';
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS okrs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            okr_type TEXT NOT NULL,
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            owner_id TEXT,
            year INTEGER NOT NULL,
            quarter INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS key_results (
            id TEXT PRIMARY KEY,
            okr_id TEXT NOT NULL REFERENCES okrs(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            target_value REAL NOT NULL,
            current_value REAL NOT NULL DEFAULT 0,
            unit TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            okr_id TEXT NOT NULL REFERENCES okrs(id) ON DELETE CASCADE,
            review_type TEXT NOT NULL,
            content TEXT NOT NULL,
            reviewer_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_team_members_user ON team_members(user_id);
        CREATE INDEX IF NOT EXISTS idx_invitations_email ON invitations(invited_email);
        CREATE INDEX IF NOT EXISTS idx_okrs_team ON okrs(team_id, year, quarter);
        CREATE INDEX IF NOT EXISTS idx_key_results_okr ON key_results(okr_id);
        CREATE INDEX IF NOT EXISTS idx_reviews_okr ON reviews(okr_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
