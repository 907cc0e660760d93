//! Input validation.
//!
//! Every function is pure: request body in, validated value or
//! `AppError::Validation` out. Services call these before touching storage.

use crate::errors::AppError;
use crate::models::{
    CreateInvitationRequest, CreateKeyResultRequest, CreateOkrRequest, CreateReviewRequest,
    CreateTeamRequest, InvitationStatus, KeyResultChanges, NewKeyResult, NewOkr, NewTeam,
    OkrChanges, OkrFilter, OkrListParams, OkrType, Pagination, PaginationParams, RegisterRequest,
    ReviewChanges, ReviewFrequency, ReviewType, TeamChanges, TeamRole, UpdateKeyResultRequest,
    UpdateOkrRequest, UpdateReviewRequest, UpdateTeamRequest, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};

pub const TEAM_NAME_MAX: usize = 100;
pub const TEAM_DESCRIPTION_MAX: usize = 500;
pub const USER_NAME_MAX: usize = 100;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;
pub const EMAIL_MAX: usize = 254;
pub const OKR_TITLE_MAX: usize = 200;
pub const OKR_DESCRIPTION_MAX: usize = 1000;
pub const KEY_RESULT_TITLE_MAX: usize = 200;
pub const KEY_RESULT_UNIT_MAX: usize = 50;
pub const REVIEW_CONTENT_MAX: usize = 2000;
pub const YEAR_MIN: i32 = 2000;
pub const YEAR_MAX: i32 = 3000;
pub const MIN_KEY_RESULTS: usize = 1;
pub const MAX_KEY_RESULTS: usize = 5;

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Validation(message.into())
}

/// Trimmed text of 1..=max characters.
fn required_text(field: &str, value: &str, max: usize) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(invalid(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Optional text; blank collapses to `None`.
fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max => Err(invalid(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        Some(v) => Ok(Some(v.to_string())),
    }
}

fn non_negative(field: &str, value: f64) -> Result<f64, AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{} must be a non-negative number", field)));
    }
    Ok(value)
}

/// Identifiers are UUIDs; anything else is rejected before any lookup.
/// Accepted spellings are normalized to the lowercase hyphenated form used
/// in storage.
pub fn id(field: &str, value: &str) -> Result<String, AppError> {
    uuid::Uuid::parse_str(value.trim())
        .map(|id| id.to_string())
        .map_err(|_| invalid(format!("{} must be a valid identifier", field)))
}

/// Emails are kept as entered (minus surrounding whitespace); matching is
/// exact and case-sensitive.
pub fn email(value: &str) -> Result<String, AppError> {
    let value = value.trim();
    let well_formed = value.len() <= EMAIL_MAX
        && !value.chars().any(char::is_whitespace)
        && match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
    if !well_formed {
        return Err(invalid("Invalid email address"));
    }
    Ok(value.to_string())
}

pub fn role(value: &str) -> Result<TeamRole, AppError> {
    TeamRole::parse(value.trim())
        .ok_or_else(|| invalid("Role must be one of: admin, member, viewer"))
}

pub fn review_frequency(value: &str) -> Result<ReviewFrequency, AppError> {
    ReviewFrequency::parse(value.trim())
        .ok_or_else(|| invalid("Review frequency must be one of: weekly, biweekly, monthly"))
}

pub fn okr_type(value: &str) -> Result<OkrType, AppError> {
    OkrType::parse(value.trim()).ok_or_else(|| invalid("OKR type must be one of: team, personal"))
}

pub fn review_type(value: &str) -> Result<ReviewType, AppError> {
    ReviewType::parse(value.trim())
        .ok_or_else(|| invalid("Review type must be one of: progress, final"))
}

pub fn invitation_status(value: &str) -> Result<InvitationStatus, AppError> {
    InvitationStatus::parse(value.trim())
        .ok_or_else(|| invalid("Status must be one of: pending, accepted, rejected"))
}

fn year(value: i32) -> Result<i32, AppError> {
    if !(YEAR_MIN..=YEAR_MAX).contains(&value) {
        return Err(invalid(format!(
            "Year must be between {} and {}",
            YEAR_MIN, YEAR_MAX
        )));
    }
    Ok(value)
}

fn quarter(value: i32) -> Result<i32, AppError> {
    if !(1..=4).contains(&value) {
        return Err(invalid("Quarter must be between 1 and 4"));
    }
    Ok(value)
}

// ==================== USERS ====================

/// A validated registration; the password is still plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
}

pub fn register(request: &RegisterRequest) -> Result<Registration, AppError> {
    let password_len = request.password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&password_len) {
        return Err(invalid(format!(
            "Password must be between {} and {} characters",
            PASSWORD_MIN, PASSWORD_MAX
        )));
    }
    Ok(Registration {
        email: email(&request.email)?,
        name: required_text("Name", &request.name, USER_NAME_MAX)?,
        password: request.password.clone(),
    })
}

pub fn user_name(value: &str) -> Result<String, AppError> {
    required_text("Name", value, USER_NAME_MAX)
}

// ==================== TEAMS ====================

pub fn create_team(request: &CreateTeamRequest) -> Result<NewTeam, AppError> {
    Ok(NewTeam {
        name: required_text("Team name", &request.name, TEAM_NAME_MAX)?,
        description: optional_text(
            "Description",
            request.description.as_deref(),
            TEAM_DESCRIPTION_MAX,
        )?,
        review_frequency: request
            .review_frequency
            .as_deref()
            .map(review_frequency)
            .transpose()?
            .unwrap_or_default(),
    })
}

pub fn update_team(request: &UpdateTeamRequest) -> Result<TeamChanges, AppError> {
    if request.name.is_none() && request.description.is_none() {
        return Err(invalid("No changes provided"));
    }
    Ok(TeamChanges {
        name: request
            .name
            .as_deref()
            .map(|n| required_text("Team name", n, TEAM_NAME_MAX))
            .transpose()?,
        description: request
            .description
            .as_deref()
            .map(|d| optional_text("Description", Some(d), TEAM_DESCRIPTION_MAX))
            .transpose()?,
        review_frequency: None,
    })
}

pub fn create_invitation(request: &CreateInvitationRequest) -> Result<(String, TeamRole), AppError> {
    Ok((email(&request.email)?, role(&request.role)?))
}

// ==================== OKRS ====================

/// A validated objective with the key results to create alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct OkrDraft {
    pub okr: NewOkr,
    pub key_results: Vec<NewKeyResult>,
}

pub fn create_okr(request: &CreateOkrRequest) -> Result<OkrDraft, AppError> {
    let okr_type = okr_type(&request.okr_type)?;
    let count = request.key_results.len();
    if !(MIN_KEY_RESULTS..=MAX_KEY_RESULTS).contains(&count) {
        return Err(invalid(format!(
            "An OKR needs between {} and {} key results",
            MIN_KEY_RESULTS, MAX_KEY_RESULTS
        )));
    }

    Ok(OkrDraft {
        okr: NewOkr {
            title: required_text("Title", &request.title, OKR_TITLE_MAX)?,
            description: optional_text(
                "Description",
                request.description.as_deref(),
                OKR_DESCRIPTION_MAX,
            )?,
            okr_type,
            team_id: id("Team id", &request.team_id)?,
            owner_id: request
                .owner_id
                .as_deref()
                .map(|o| id("Owner id", o))
                .transpose()?,
            year: year(request.year)?,
            quarter: quarter(request.quarter)?,
        },
        key_results: request
            .key_results
            .iter()
            .map(key_result)
            .collect::<Result<_, _>>()?,
    })
}

pub fn update_okr(request: &UpdateOkrRequest) -> Result<OkrChanges, AppError> {
    let changes = OkrChanges {
        title: request
            .title
            .as_deref()
            .map(|t| required_text("Title", t, OKR_TITLE_MAX))
            .transpose()?,
        description: request
            .description
            .as_deref()
            .map(|d| optional_text("Description", Some(d), OKR_DESCRIPTION_MAX))
            .transpose()?,
        year: request.year.map(year).transpose()?,
        quarter: request.quarter.map(quarter).transpose()?,
    };
    if changes == OkrChanges::default() {
        return Err(invalid("No changes provided"));
    }
    Ok(changes)
}

pub fn key_result(request: &CreateKeyResultRequest) -> Result<NewKeyResult, AppError> {
    Ok(NewKeyResult {
        title: required_text("Key result title", &request.title, KEY_RESULT_TITLE_MAX)?,
        target_value: non_negative("Target value", request.target_value)?,
        current_value: non_negative("Current value", request.current_value.unwrap_or(0.0))?,
        unit: optional_text("Unit", request.unit.as_deref(), KEY_RESULT_UNIT_MAX)?,
    })
}

pub fn update_key_result(request: &UpdateKeyResultRequest) -> Result<KeyResultChanges, AppError> {
    let changes = KeyResultChanges {
        title: request
            .title
            .as_deref()
            .map(|t| required_text("Key result title", t, KEY_RESULT_TITLE_MAX))
            .transpose()?,
        target_value: request
            .target_value
            .map(|v| non_negative("Target value", v))
            .transpose()?,
        current_value: request
            .current_value
            .map(|v| non_negative("Current value", v))
            .transpose()?,
        unit: request
            .unit
            .as_deref()
            .map(|u| optional_text("Unit", Some(u), KEY_RESULT_UNIT_MAX))
            .transpose()?,
    };
    if changes == KeyResultChanges::default() {
        return Err(invalid("No changes provided"));
    }
    Ok(changes)
}

/// Progress may exceed the target; only negatives are rejected.
pub fn progress(current_value: f64) -> Result<f64, AppError> {
    non_negative("Current value", current_value)
}

// ==================== REVIEWS ====================

pub fn create_review(request: &CreateReviewRequest) -> Result<(ReviewType, String), AppError> {
    Ok((
        review_type(&request.review_type)?,
        required_text("Content", &request.content, REVIEW_CONTENT_MAX)?,
    ))
}

pub fn update_review(request: &UpdateReviewRequest) -> Result<ReviewChanges, AppError> {
    let changes = ReviewChanges {
        review_type: request.review_type.as_deref().map(review_type).transpose()?,
        content: request
            .content
            .as_deref()
            .map(|c| required_text("Content", c, REVIEW_CONTENT_MAX))
            .transpose()?,
    };
    if changes == ReviewChanges::default() {
        return Err(invalid("No changes provided"));
    }
    Ok(changes)
}

// ==================== LISTINGS ====================

pub fn pagination(params: &PaginationParams) -> Result<Pagination, AppError> {
    let page = params.page.unwrap_or(1);
    if page == 0 {
        return Err(invalid("Page must be at least 1"));
    }
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(invalid(format!(
            "Limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    Ok(Pagination {
        page,
        limit,
        order: params.order.unwrap_or_default(),
        order_by: params.order_by.unwrap_or_default(),
    })
}

/// Validated filter for one team's objectives.
pub fn okr_filter(team_id: &str, params: &OkrListParams) -> Result<(OkrFilter, Pagination), AppError> {
    let filter = OkrFilter {
        team_id: Some(id("Team id", team_id)?),
        owner_id: params
            .owner_id
            .as_deref()
            .map(|o| id("Owner id", o))
            .transpose()?,
        okr_type: params.okr_type.as_deref().map(okr_type).transpose()?,
        year: params.year.map(year).transpose()?,
        quarter: params.quarter.map(quarter).transpose()?,
    };
    let pagination = pagination(&PaginationParams {
        page: params.page,
        limit: params.limit,
        order: params.order,
        order_by: params.order_by,
    })?;
    Ok((filter, pagination))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEAM_ID: &str = "7f6c1a52-3f1e-4d7e-9a55-2d3c1f0b8e11";

    fn okr_request(okr_type: &str, key_results: usize) -> CreateOkrRequest {
        CreateOkrRequest {
            title: "Improve onboarding".to_string(),
            description: None,
            okr_type: okr_type.to_string(),
            team_id: TEAM_ID.to_string(),
            owner_id: None,
            year: 2025,
            quarter: 2,
            key_results: (0..key_results)
                .map(|i| CreateKeyResultRequest {
                    title: format!("KR {}", i),
                    target_value: 10.0,
                    current_value: None,
                    unit: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_team_name_bounds() {
        let mut request = CreateTeamRequest {
            name: "   ".to_string(),
            description: None,
            review_frequency: None,
        };
        assert!(create_team(&request).is_err());

        request.name = "x".repeat(TEAM_NAME_MAX);
        let team = create_team(&request).unwrap();
        assert_eq!(team.review_frequency, ReviewFrequency::Weekly);

        request.name = "x".repeat(TEAM_NAME_MAX + 1);
        assert!(create_team(&request).is_err());
    }

    #[test]
    fn test_review_frequency_membership() {
        assert_eq!(review_frequency("biweekly").unwrap(), ReviewFrequency::Biweekly);
        assert!(review_frequency("daily").is_err());
    }

    #[test]
    fn test_id_is_canonicalized() {
        let canonical = "6f1c2a9e-3b4d-4e5f-8a7b-1c2d3e4f5a6b";
        assert_eq!(id("Team id", "6F1C2A9E-3B4D-4E5F-8A7B-1C2D3E4F5A6B").unwrap(), canonical);
        assert_eq!(id("Team id", "6f1c2a9e3b4d4e5f8a7b1c2d3e4f5a6b").unwrap(), canonical);
        assert_eq!(id("Team id", " {6f1c2a9e-3b4d-4e5f-8a7b-1c2d3e4f5a6b} ").unwrap(), canonical);
        assert!(matches!(id("Team id", "team-1"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_email_format() {
        assert_eq!(email(" X@Example.com ").unwrap(), "X@Example.com");
        assert!(email("no-at-sign").is_err());
        assert!(email("a@b").is_err());
        assert!(email("a@@b.com").is_err());
        assert!(email("a b@c.com").is_err());
        assert!(email("@c.com").is_err());
    }

    #[test]
    fn test_identifier_format() {
        assert!(id("Team id", TEAM_ID).is_ok());
        assert!(id("Team id", "42").is_err());
    }

    #[test]
    fn test_okr_key_result_count() {
        assert!(create_okr(&okr_request("team", 0)).is_err());
        assert!(create_okr(&okr_request("team", 1)).is_ok());
        assert!(create_okr(&okr_request("team", 5)).is_ok());
        assert!(create_okr(&okr_request("team", 6)).is_err());
    }

    #[test]
    fn test_okr_type_label() {
        assert_eq!(
            create_okr(&okr_request("personal", 1)).unwrap().okr.okr_type,
            OkrType::Personal
        );
        let err = create_okr(&okr_request("individual", 1)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_okr_period_bounds() {
        let mut request = okr_request("team", 1);
        request.quarter = 5;
        assert!(create_okr(&request).is_err());
        request.quarter = 4;
        request.year = 1999;
        assert!(create_okr(&request).is_err());
        request.year = 3000;
        assert!(create_okr(&request).is_ok());
    }

    #[test]
    fn test_progress_allows_overachievement() {
        assert_eq!(progress(0.0).unwrap(), 0.0);
        assert_eq!(progress(250.0).unwrap(), 250.0);
        assert!(progress(-0.5).is_err());
        assert!(progress(f64::NAN).is_err());
    }

    #[test]
    fn test_review_content_bounds() {
        let request = CreateReviewRequest {
            review_type: "final".to_string(),
            content: "x".repeat(REVIEW_CONTENT_MAX + 1),
        };
        assert!(create_review(&request).is_err());
        let request = CreateReviewRequest {
            review_type: "weekly".to_string(),
            content: "ok".to_string(),
        };
        assert!(create_review(&request).is_err());
    }

    #[test]
    fn test_empty_updates_rejected() {
        assert!(update_okr(&UpdateOkrRequest::default()).is_err());
        assert!(update_key_result(&UpdateKeyResultRequest::default()).is_err());
        assert!(update_review(&UpdateReviewRequest::default()).is_err());
        assert!(update_team(&UpdateTeamRequest::default()).is_err());
    }

    #[test]
    fn test_blank_description_clears() {
        let changes = update_team(&UpdateTeamRequest {
            name: None,
            description: Some("  ".to_string()),
        })
        .unwrap();
        assert_eq!(changes.description, Some(None));
    }

    #[test]
    fn test_pagination_bounds() {
        let defaults = pagination(&PaginationParams::default()).unwrap();
        assert_eq!(defaults, Pagination::default());

        let params = PaginationParams {
            page: Some(0),
            ..PaginationParams::default()
        };
        assert!(pagination(&params).is_err());

        let params = PaginationParams {
            limit: Some(MAX_PAGE_LIMIT + 1),
            ..PaginationParams::default()
        };
        assert!(pagination(&params).is_err());
    }
}
