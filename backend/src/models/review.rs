//! Periodic reviews of an objective.

use serde::{Deserialize, Serialize};

/// Kind of review.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    Progress,
    Final,
}

impl ReviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::Progress => "progress",
            ReviewType::Final => "final",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "progress" => Some(ReviewType::Progress),
            "final" => Some(ReviewType::Final),
            _ => None,
        }
    }
}

/// A review written by one user about an objective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub okr_id: String,
    #[serde(rename = "type")]
    pub review_type: ReviewType,
    pub content: String,
    pub reviewer_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Row to insert when creating a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub okr_id: String,
    pub review_type: ReviewType,
    pub content: String,
    pub reviewer_id: String,
}

/// Validated partial update of a review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewChanges {
    pub review_type: Option<ReviewType>,
    pub content: Option<String>,
}

/// Request body for creating a review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[serde(rename = "type")]
    pub review_type: String,
    pub content: String,
}

/// Request body for updating a review.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    #[serde(default, rename = "type")]
    pub review_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}
