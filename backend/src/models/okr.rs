//! Objectives and their key results.

use serde::{Deserialize, Serialize};

/// Whether an objective belongs to the whole team or to one person.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OkrType {
    Team,
    Personal,
}

impl OkrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OkrType::Team => "team",
            OkrType::Personal => "personal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "team" => Some(OkrType::Team),
            "personal" => Some(OkrType::Personal),
            _ => None,
        }
    }
}

/// An objective scoped to a team and a quarter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Okr {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub okr_type: OkrType,
    pub team_id: String,
    /// Absent for ownerless team OKRs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub year: i32,
    pub quarter: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// A measurable result attached to an objective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyResult {
    pub id: String,
    pub okr_id: String,
    pub title: String,
    pub target_value: f64,
    /// Not clamped to `target_value`; overachievement is allowed.
    pub current_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// An objective together with its key results.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OkrWithKeyResults {
    #[serde(flatten)]
    pub okr: Okr,
    pub key_results: Vec<KeyResult>,
}

/// Row to insert when creating an objective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOkr {
    pub title: String,
    pub description: Option<String>,
    pub okr_type: OkrType,
    pub team_id: String,
    pub owner_id: Option<String>,
    pub year: i32,
    pub quarter: i32,
}

/// Validated partial update of an objective.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OkrChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub year: Option<i32>,
    pub quarter: Option<i32>,
}

/// Row to insert when creating a key result.
#[derive(Debug, Clone, PartialEq)]
pub struct NewKeyResult {
    pub title: String,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: Option<String>,
}

/// Validated partial update of a key result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyResultChanges {
    pub title: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    pub unit: Option<Option<String>>,
}

/// Filter for objective listings. `team_id` is always set by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OkrFilter {
    pub team_id: Option<String>,
    pub owner_id: Option<String>,
    pub okr_type: Option<OkrType>,
    pub year: Option<i32>,
    pub quarter: Option<i32>,
}

/// Request body for a key result nested in an objective or posted alone.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyResultRequest {
    pub title: String,
    pub target_value: f64,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Request body for creating an objective.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOkrRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub okr_type: String,
    pub team_id: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub year: i32,
    pub quarter: i32,
    pub key_results: Vec<CreateKeyResultRequest>,
}

/// Request body for updating an objective.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOkrRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub quarter: Option<i32>,
}

/// Request body for updating a key result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKeyResultRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Request body for recording progress on a key result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub current_value: f64,
}

/// Query string for listing a team's objectives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkrListParams {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default, rename = "type")]
    pub okr_type: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub quarter: Option<i32>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub order: Option<super::SortOrder>,
    #[serde(default)]
    pub order_by: Option<super::OrderBy>,
}
