//! Team invitations.

use serde::{Deserialize, Serialize};

use super::TeamRole;

/// Lifecycle state of an invitation. Only `Pending` may transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InvitationStatus::Pending),
            "accepted" => Some(InvitationStatus::Accepted),
            "rejected" => Some(InvitationStatus::Rejected),
            _ => None,
        }
    }
}

/// An invitation for an email address to join a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    pub team_id: String,
    pub invited_email: String,
    pub invited_by_id: String,
    pub role: TeamRole,
    pub status: InvitationStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Row to insert when inviting someone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvitation {
    pub team_id: String,
    pub invited_email: String,
    pub invited_by_id: String,
    pub role: TeamRole,
}

/// Filter for invitation listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationFilter {
    pub team_id: Option<String>,
    pub invited_email: Option<String>,
    pub status: Option<InvitationStatus>,
}

/// Request body for inviting someone to a team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: String,
}

/// Query string for listing the caller's invitations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationListParams {
    #[serde(default)]
    pub status: Option<String>,
}
