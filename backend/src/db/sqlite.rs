//! SQLite implementation of every repository port.
//!
//! Uses prepared statements; uniqueness and status guards are enforced by the
//! schema and by conditional `UPDATE`s rather than by read-then-write checks.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::ports::*;
use super::timestamp;
use crate::auth::SessionStore;
use crate::errors::RepositoryError;
use crate::models::{
    Invitation, InvitationFilter, InvitationStatus, KeyResult, KeyResultChanges, NewInvitation,
    NewKeyResult, NewOkr, NewReview, NewTeam, NewUser, Okr, OkrChanges, OkrFilter, OkrType, Page,
    Pagination, ReviewFrequency, Review, ReviewChanges, ReviewType, Session, Team, TeamChanges,
    TeamMember, TeamRole, User,
};

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";
const TEAM_COLUMNS: &str = "id, name, description, review_frequency, created_at, updated_at";
const INVITATION_COLUMNS: &str =
    "id, team_id, invited_email, invited_by_id, role, status, created_at, updated_at";
const OKR_COLUMNS: &str =
    "id, title, description, okr_type, team_id, owner_id, year, quarter, created_at, updated_at";
const KEY_RESULT_COLUMNS: &str =
    "id, okr_id, title, target_value, current_value, unit, created_at, updated_at";
const REVIEW_COLUMNS: &str =
    "id, okr_id, review_type, content, reviewer_id, created_at, updated_at";

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run a filtered SELECT (everything before ORDER BY) as one page, using
    /// `count` for the total.
    async fn fetch_page<T>(
        &self,
        mut select: QueryBuilder<'_, Sqlite>,
        mut count: QueryBuilder<'_, Sqlite>,
        pagination: &Pagination,
        from_row: fn(&SqliteRow) -> RepoResult<T>,
    ) -> RepoResult<Page<T>> {
        let total: i64 = count.build().fetch_one(&self.pool).await?.try_get(0)?;

        let order = pagination.order.as_sql();
        select.push(format!(
            " ORDER BY {} {}, rowid {}",
            pagination.order_by.column(),
            order,
            order
        ));
        select.push(" LIMIT ");
        select.push_bind(pagination.limit as i64);
        select.push(" OFFSET ");
        select.push_bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX));

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(from_row).collect::<RepoResult<Vec<T>>>()?;

        Ok(Page {
            items,
            total: total as u64,
            page: pagination.page,
            limit: pagination.limit,
        })
    }
}

// ==================== USER OPERATIONS ====================

#[async_trait]
impl UserRepository for SqliteStore {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user_name(&self, id: &str, name: &str) -> RepoResult<Option<User>> {
        let result = sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }
}

// ==================== SESSION OPERATIONS ====================

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, session: Session) -> RepoResult<Session> {
        sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(timestamp())
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.token)
            .bind(&session.user_id)
            .bind(&session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(session)
    }

    async fn get_session(&self, token: &str) -> RepoResult<Option<Session>> {
        let row = sqlx::query("SELECT token, user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> RepoResult<Session> {
            Ok(Session {
                token: row.try_get("token")?,
                user_id: row.try_get("user_id")?,
                expires_at: row.try_get("expires_at")?,
            })
        })
        .transpose()
    }

    async fn revoke_session(&self, token: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== TEAM OPERATIONS ====================

#[async_trait]
impl TeamRepository for SqliteStore {
    async fn create_team(&self, team: NewTeam) -> RepoResult<Team> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            "INSERT INTO teams (id, name, description, review_frequency, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&team.name)
        .bind(&team.description)
        .bind(team.review_frequency.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Team {
            id,
            name: team.name,
            description: team.description,
            review_frequency: team.review_frequency,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn get_team(&self, id: &str) -> RepoResult<Option<Team>> {
        let row = sqlx::query(&format!("SELECT {} FROM teams WHERE id = ?", TEAM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(team_from_row).transpose()
    }

    async fn update_team(&self, id: &str, changes: &TeamChanges) -> RepoResult<Option<Team>> {
        let Some(existing) = self.get_team(id).await? else {
            return Ok(None);
        };

        let name = changes.name.clone().unwrap_or(existing.name);
        let description = changes.description.clone().unwrap_or(existing.description);
        let review_frequency = changes.review_frequency.unwrap_or(existing.review_frequency);

        let result = sqlx::query(
            "UPDATE teams SET name = ?, description = ?, review_frequency = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(&description)
        .bind(review_frequency.as_str())
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_team(id).await
    }

    async fn delete_team(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_teams_for_user(
        &self,
        user_id: &str,
        pagination: &Pagination,
    ) -> RepoResult<Page<Team>> {
        let mut select = QueryBuilder::new(format!(
            "SELECT {} FROM teams WHERE id IN (SELECT team_id FROM team_members WHERE user_id = ",
            TEAM_COLUMNS
        ));
        select.push_bind(user_id.to_string()).push(")");

        let mut count = QueryBuilder::new(
            "SELECT COUNT(*) FROM teams WHERE id IN (SELECT team_id FROM team_members WHERE user_id = ",
        );
        count.push_bind(user_id.to_string()).push(")");

        self.fetch_page(select, count, pagination, team_from_row)
            .await
    }
}

// ==================== MEMBERSHIP OPERATIONS ====================

#[async_trait]
impl TeamMemberRepository for SqliteStore {
    async fn add_member(&self, member: TeamMember) -> RepoResult<TeamMember> {
        sqlx::query("INSERT INTO team_members (team_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
            .bind(&member.team_id)
            .bind(&member.user_id)
            .bind(member.role.as_str())
            .bind(&member.joined_at)
            .execute(&self.pool)
            .await?;
        Ok(member)
    }

    async fn get_member(&self, team_id: &str, user_id: &str) -> RepoResult<Option<TeamMember>> {
        let row = sqlx::query(
            "SELECT team_id, user_id, role, joined_at FROM team_members WHERE team_id = ? AND user_id = ?",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn update_member_role(
        &self,
        team_id: &str,
        user_id: &str,
        role: TeamRole,
    ) -> RepoResult<Option<TeamMember>> {
        let result =
            sqlx::query("UPDATE team_members SET role = ? WHERE team_id = ? AND user_id = ?")
                .bind(role.as_str())
                .bind(team_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_member(team_id, user_id).await
    }

    async fn remove_member(&self, team_id: &str, user_id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_members(&self, team_id: &str) -> RepoResult<Vec<TeamMember>> {
        let rows = sqlx::query(
            "SELECT team_id, user_id, role, joined_at FROM team_members WHERE team_id = ? ORDER BY joined_at, rowid",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(member_from_row).collect()
    }
}

// ==================== INVITATION OPERATIONS ====================

#[async_trait]
impl InvitationRepository for SqliteStore {
    async fn create_invitation(&self, invitation: NewInvitation) -> RepoResult<Invitation> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            "INSERT INTO invitations (id, team_id, invited_email, invited_by_id, role, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)",
        )
        .bind(&id)
        .bind(&invitation.team_id)
        .bind(&invitation.invited_email)
        .bind(&invitation.invited_by_id)
        .bind(invitation.role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Invitation {
            id,
            team_id: invitation.team_id,
            invited_email: invitation.invited_email,
            invited_by_id: invitation.invited_by_id,
            role: invitation.role,
            status: InvitationStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn get_invitation(&self, id: &str) -> RepoResult<Option<Invitation>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM invitations WHERE id = ?",
            INVITATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(invitation_from_row).transpose()
    }

    async fn transition_invitation(
        &self,
        id: &str,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> RepoResult<Option<Invitation>> {
        // Conditional update: only one of several racing callers can match.
        let result = sqlx::query(
            "UPDATE invitations SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(timestamp())
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_invitation(id).await
    }

    async fn delete_invitation(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM invitations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_invitations(
        &self,
        filter: &InvitationFilter,
        pagination: &Pagination,
    ) -> RepoResult<Page<Invitation>> {
        let mut select = QueryBuilder::new(format!(
            "SELECT {} FROM invitations WHERE 1 = 1",
            INVITATION_COLUMNS
        ));
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM invitations WHERE 1 = 1");
        for qb in [&mut select, &mut count] {
            if let Some(team_id) = &filter.team_id {
                qb.push(" AND team_id = ").push_bind(team_id.clone());
            }
            if let Some(email) = &filter.invited_email {
                qb.push(" AND invited_email = ").push_bind(email.clone());
            }
            if let Some(status) = filter.status {
                qb.push(" AND status = ").push_bind(status.as_str());
            }
        }

        self.fetch_page(select, count, pagination, invitation_from_row)
            .await
    }
}

// ==================== OKR OPERATIONS ====================

#[async_trait]
impl OkrRepository for SqliteStore {
    async fn create_okr(&self, okr: NewOkr) -> RepoResult<Okr> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            "INSERT INTO okrs (id, title, description, okr_type, team_id, owner_id, year, quarter, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&okr.title)
        .bind(&okr.description)
        .bind(okr.okr_type.as_str())
        .bind(&okr.team_id)
        .bind(&okr.owner_id)
        .bind(okr.year)
        .bind(okr.quarter)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Okr {
            id,
            title: okr.title,
            description: okr.description,
            okr_type: okr.okr_type,
            team_id: okr.team_id,
            owner_id: okr.owner_id,
            year: okr.year,
            quarter: okr.quarter,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn get_okr(&self, id: &str) -> RepoResult<Option<Okr>> {
        let row = sqlx::query(&format!("SELECT {} FROM okrs WHERE id = ?", OKR_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(okr_from_row).transpose()
    }

    async fn update_okr(&self, id: &str, changes: &OkrChanges) -> RepoResult<Option<Okr>> {
        let Some(existing) = self.get_okr(id).await? else {
            return Ok(None);
        };

        let title = changes.title.clone().unwrap_or(existing.title);
        let description = changes.description.clone().unwrap_or(existing.description);
        let year = changes.year.unwrap_or(existing.year);
        let quarter = changes.quarter.unwrap_or(existing.quarter);

        let result = sqlx::query(
            "UPDATE okrs SET title = ?, description = ?, year = ?, quarter = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&title)
        .bind(&description)
        .bind(year)
        .bind(quarter)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_okr(id).await
    }

    async fn delete_okr(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM okrs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_okrs(&self, filter: &OkrFilter, pagination: &Pagination) -> RepoResult<Page<Okr>> {
        let mut select = QueryBuilder::new(format!("SELECT {} FROM okrs WHERE 1 = 1", OKR_COLUMNS));
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM okrs WHERE 1 = 1");
        for qb in [&mut select, &mut count] {
            if let Some(team_id) = &filter.team_id {
                qb.push(" AND team_id = ").push_bind(team_id.clone());
            }
            if let Some(owner_id) = &filter.owner_id {
                qb.push(" AND owner_id = ").push_bind(owner_id.clone());
            }
            if let Some(okr_type) = filter.okr_type {
                qb.push(" AND okr_type = ").push_bind(okr_type.as_str());
            }
            if let Some(year) = filter.year {
                qb.push(" AND year = ").push_bind(year);
            }
            if let Some(quarter) = filter.quarter {
                qb.push(" AND quarter = ").push_bind(quarter);
            }
        }

        self.fetch_page(select, count, pagination, okr_from_row).await
    }
}

// ==================== KEY RESULT OPERATIONS ====================

#[async_trait]
impl KeyResultRepository for SqliteStore {
    async fn create_key_result(
        &self,
        okr_id: &str,
        key_result: NewKeyResult,
        max_per_okr: usize,
    ) -> RepoResult<KeyResult> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        // Single statement, so the count and the insert share the write lock.
        let result = sqlx::query(
            r#"
            INSERT INTO key_results (id, okr_id, title, target_value, current_value, unit, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?
            WHERE (SELECT COUNT(*) FROM key_results WHERE okr_id = ?) < ?
            "#,
        )
        .bind(&id)
        .bind(okr_id)
        .bind(&key_result.title)
        .bind(key_result.target_value)
        .bind(key_result.current_value)
        .bind(&key_result.unit)
        .bind(&now)
        .bind(&now)
        .bind(okr_id)
        .bind(max_per_okr as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "okr {} already holds {} key results",
                okr_id, max_per_okr
            )));
        }

        Ok(KeyResult {
            id,
            okr_id: okr_id.to_string(),
            title: key_result.title,
            target_value: key_result.target_value,
            current_value: key_result.current_value,
            unit: key_result.unit,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn get_key_result(&self, id: &str) -> RepoResult<Option<KeyResult>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM key_results WHERE id = ?",
            KEY_RESULT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(key_result_from_row).transpose()
    }

    async fn update_key_result(
        &self,
        id: &str,
        changes: &KeyResultChanges,
    ) -> RepoResult<Option<KeyResult>> {
        let Some(existing) = self.get_key_result(id).await? else {
            return Ok(None);
        };

        let title = changes.title.clone().unwrap_or(existing.title);
        let target_value = changes.target_value.unwrap_or(existing.target_value);
        let current_value = changes.current_value.unwrap_or(existing.current_value);
        let unit = changes.unit.clone().unwrap_or(existing.unit);

        let result = sqlx::query(
            "UPDATE key_results SET title = ?, target_value = ?, current_value = ?, unit = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&title)
        .bind(target_value)
        .bind(current_value)
        .bind(&unit)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_key_result(id).await
    }

    async fn delete_key_result(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM key_results WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_key_results(&self, okr_id: &str) -> RepoResult<Vec<KeyResult>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM key_results WHERE okr_id = ? ORDER BY created_at, rowid",
            KEY_RESULT_COLUMNS
        ))
        .bind(okr_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(key_result_from_row).collect()
    }
}

// ==================== REVIEW OPERATIONS ====================

#[async_trait]
impl ReviewRepository for SqliteStore {
    async fn create_review(&self, review: NewReview) -> RepoResult<Review> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            "INSERT INTO reviews (id, okr_id, review_type, content, reviewer_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&review.okr_id)
        .bind(review.review_type.as_str())
        .bind(&review.content)
        .bind(&review.reviewer_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Review {
            id,
            okr_id: review.okr_id,
            review_type: review.review_type,
            content: review.content,
            reviewer_id: review.reviewer_id,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn get_review(&self, id: &str) -> RepoResult<Option<Review>> {
        let row = sqlx::query(&format!("SELECT {} FROM reviews WHERE id = ?", REVIEW_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn update_review(&self, id: &str, changes: &ReviewChanges) -> RepoResult<Option<Review>> {
        let Some(existing) = self.get_review(id).await? else {
            return Ok(None);
        };

        let review_type = changes.review_type.unwrap_or(existing.review_type);
        let content = changes.content.clone().unwrap_or(existing.content);

        let result = sqlx::query(
            "UPDATE reviews SET review_type = ?, content = ?, updated_at = ? WHERE id = ?",
        )
        .bind(review_type.as_str())
        .bind(&content)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_review(id).await
    }

    async fn delete_review(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reviews(&self, okr_id: &str, pagination: &Pagination) -> RepoResult<Page<Review>> {
        let mut select = QueryBuilder::new(format!(
            "SELECT {} FROM reviews WHERE okr_id = ",
            REVIEW_COLUMNS
        ));
        select.push_bind(okr_id.to_string());
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM reviews WHERE okr_id = ");
        count.push_bind(okr_id.to_string());

        self.fetch_page(select, count, pagination, review_from_row)
            .await
    }
}

// Helper functions for row conversion

fn invalid(column: &str, value: &str) -> RepositoryError {
    RepositoryError::Storage(format!("invalid {} value in database: {}", column, value))
}

fn user_from_row(row: &SqliteRow) -> RepoResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn team_from_row(row: &SqliteRow) -> RepoResult<Team> {
    let frequency: String = row.try_get("review_frequency")?;
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        review_frequency: ReviewFrequency::parse(&frequency)
            .ok_or_else(|| invalid("review_frequency", &frequency))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn member_from_row(row: &SqliteRow) -> RepoResult<TeamMember> {
    let role: String = row.try_get("role")?;
    Ok(TeamMember {
        team_id: row.try_get("team_id")?,
        user_id: row.try_get("user_id")?,
        role: TeamRole::parse(&role).ok_or_else(|| invalid("role", &role))?,
        joined_at: row.try_get("joined_at")?,
    })
}

fn invitation_from_row(row: &SqliteRow) -> RepoResult<Invitation> {
    let role: String = row.try_get("role")?;
    let status: String = row.try_get("status")?;
    Ok(Invitation {
        id: row.try_get("id")?,
        team_id: row.try_get("team_id")?,
        invited_email: row.try_get("invited_email")?,
        invited_by_id: row.try_get("invited_by_id")?,
        role: TeamRole::parse(&role).ok_or_else(|| invalid("role", &role))?,
        status: InvitationStatus::parse(&status).ok_or_else(|| invalid("status", &status))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn okr_from_row(row: &SqliteRow) -> RepoResult<Okr> {
    let okr_type: String = row.try_get("okr_type")?;
    Ok(Okr {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        okr_type: OkrType::parse(&okr_type).ok_or_else(|| invalid("okr_type", &okr_type))?,
        team_id: row.try_get("team_id")?,
        owner_id: row.try_get("owner_id")?,
        year: row.try_get("year")?,
        quarter: row.try_get("quarter")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn key_result_from_row(row: &SqliteRow) -> RepoResult<KeyResult> {
    Ok(KeyResult {
        id: row.try_get("id")?,
        okr_id: row.try_get("okr_id")?,
        title: row.try_get("title")?,
        target_value: row.try_get("target_value")?,
        current_value: row.try_get("current_value")?,
        unit: row.try_get("unit")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn review_from_row(row: &SqliteRow) -> RepoResult<Review> {
    let review_type: String = row.try_get("review_type")?;
    Ok(Review {
        id: row.try_get("id")?,
        okr_id: row.try_get("okr_id")?,
        review_type: ReviewType::parse(&review_type)
            .ok_or_else(|| invalid("review_type", &review_type))?,
        content: row.try_get("content")?,
        reviewer_id: row.try_get("reviewer_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .expect("Failed to init DB");
        (SqliteStore::new(pool), temp_dir)
    }

    async fn seed_team(store: &SqliteStore) -> (User, Team) {
        let user = store
            .create_user(NewUser {
                email: "owner@example.com".to_string(),
                name: "Owner".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let team = store
            .create_team(NewTeam {
                name: "Platform".to_string(),
                description: None,
                review_frequency: ReviewFrequency::Weekly,
            })
            .await
            .unwrap();
        (user, team)
    }

    #[tokio::test]
    async fn test_duplicate_membership_is_conflict() {
        let (store, _dir) = store().await;
        let (user, team) = seed_team(&store).await;
        let member = TeamMember {
            team_id: team.id.clone(),
            user_id: user.id.clone(),
            role: TeamRole::Admin,
            joined_at: timestamp(),
        };

        store.add_member(member.clone()).await.unwrap();
        let err = store.add_member(member).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_second_pending_invitation_is_conflict() {
        let (store, _dir) = store().await;
        let (user, team) = seed_team(&store).await;
        let new_invitation = NewInvitation {
            team_id: team.id.clone(),
            invited_email: "x@example.com".to_string(),
            invited_by_id: user.id.clone(),
            role: TeamRole::Member,
        };

        let first = store.create_invitation(new_invitation.clone()).await.unwrap();
        let err = store
            .create_invitation(new_invitation.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Once resolved, the pair may be invited again.
        store
            .transition_invitation(&first.id, InvitationStatus::Pending, InvitationStatus::Rejected)
            .await
            .unwrap()
            .unwrap();
        assert!(store.create_invitation(new_invitation).await.is_ok());
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_swap() {
        let (store, _dir) = store().await;
        let (user, team) = seed_team(&store).await;
        let invitation = store
            .create_invitation(NewInvitation {
                team_id: team.id.clone(),
                invited_email: "x@example.com".to_string(),
                invited_by_id: user.id.clone(),
                role: TeamRole::Viewer,
            })
            .await
            .unwrap();

        let accepted = store
            .transition_invitation(&invitation.id, InvitationStatus::Pending, InvitationStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.unwrap().status, InvitationStatus::Accepted);

        let again = store
            .transition_invitation(&invitation.id, InvitationStatus::Pending, InvitationStatus::Rejected)
            .await
            .unwrap();
        assert!(again.is_none());
        let stored = store.get_invitation(&invitation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_delete_okr_cascades_key_results() {
        let (store, _dir) = store().await;
        let (user, team) = seed_team(&store).await;
        let okr = store
            .create_okr(NewOkr {
                title: "Ship v2".to_string(),
                description: None,
                okr_type: OkrType::Personal,
                team_id: team.id.clone(),
                owner_id: Some(user.id.clone()),
                year: 2025,
                quarter: 3,
            })
            .await
            .unwrap();
        let key_result = store
            .create_key_result(
                &okr.id,
                NewKeyResult {
                    title: "Latency".to_string(),
                    target_value: 100.0,
                    current_value: 0.0,
                    unit: Some("ms".to_string()),
                },
                5,
            )
            .await
            .unwrap();

        assert!(store.delete_okr(&okr.id).await.unwrap());
        assert!(store.get_key_result(&key_result.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_okrs_filters_and_pages() {
        let (store, _dir) = store().await;
        let (user, team) = seed_team(&store).await;
        for quarter in 1..=4 {
            store
                .create_okr(NewOkr {
                    title: format!("Q{}", quarter),
                    description: None,
                    okr_type: OkrType::Team,
                    team_id: team.id.clone(),
                    owner_id: None,
                    year: 2025,
                    quarter,
                })
                .await
                .unwrap();
        }
        store
            .create_okr(NewOkr {
                title: "Mine".to_string(),
                description: None,
                okr_type: OkrType::Personal,
                team_id: team.id.clone(),
                owner_id: Some(user.id.clone()),
                year: 2025,
                quarter: 1,
            })
            .await
            .unwrap();

        let filter = OkrFilter {
            team_id: Some(team.id.clone()),
            okr_type: Some(OkrType::Team),
            ..OkrFilter::default()
        };
        let pagination = Pagination {
            page: 2,
            limit: 3,
            ..Pagination::default()
        };
        let page = store.list_okrs(&filter, &pagination).await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Q4");

        let filter = OkrFilter {
            team_id: Some(team.id.clone()),
            quarter: Some(1),
            ..OkrFilter::default()
        };
        let page = store.list_okrs(&filter, &Pagination::default()).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_new_session_purges_expired_ones() {
        let (store, _dir) = store().await;
        let (user, _) = seed_team(&store).await;
        store
            .create_session(Session {
                token: "stale".to_string(),
                user_id: user.id.clone(),
                expires_at: "2000-01-01T00:00:00.000000Z".to_string(),
            })
            .await
            .unwrap();

        store
            .create_session(Session {
                token: "fresh".to_string(),
                user_id: user.id.clone(),
                expires_at: "2999-01-01T00:00:00.000000Z".to_string(),
            })
            .await
            .unwrap();
        assert!(store.get_session("stale").await.unwrap().is_none());
        assert!(store.get_session("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_key_result_insert_stops_at_cap() {
        let (store, _dir) = store().await;
        let (user, team) = seed_team(&store).await;
        let okr = store
            .create_okr(NewOkr {
                title: "Ship v2".to_string(),
                description: None,
                okr_type: OkrType::Team,
                team_id: team.id.clone(),
                owner_id: Some(user.id.clone()),
                year: 2025,
                quarter: 3,
            })
            .await
            .unwrap();
        let key_result = |title: &str| NewKeyResult {
            title: title.to_string(),
            target_value: 10.0,
            current_value: 0.0,
            unit: None,
        };

        store.create_key_result(&okr.id, key_result("a"), 2).await.unwrap();
        store.create_key_result(&okr.id, key_result("b"), 2).await.unwrap();
        let err = store
            .create_key_result(&okr.id, key_result("c"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.list_key_results(&okr.id).await.unwrap().len(), 2);
    }
}
