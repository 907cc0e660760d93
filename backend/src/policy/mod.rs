//! Authorization policy.
//!
//! `authorize` is a pure function of the caller, the caller's role in the
//! team that owns the resource, and a snapshot of the resource. It never
//! touches storage; services load the snapshot first.

use crate::errors::AppError;
use crate::models::{Okr, OkrType, Review, TeamRole};

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    /// Denials become `Forbidden` with the reason as message.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AppError::Forbidden(reason.to_string())),
        }
    }
}

/// The caller as seen from one team.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub user_id: &'a str,
    /// `None` when the caller is not a member of the team.
    pub role: Option<TeamRole>,
}

impl<'a> Subject<'a> {
    pub fn new(user_id: &'a str, role: Option<TeamRole>) -> Self {
        Self { user_id, role }
    }

    fn is_admin(&self) -> bool {
        self.role == Some(TeamRole::Admin)
    }
}

/// Admin-only team operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamAction {
    Update,
    ChangeReviewFrequency,
    Invite,
    CancelInvitation,
    RemoveMember,
    ChangeRole,
    Delete,
}

impl TeamAction {
    fn denial(&self) -> &'static str {
        match self {
            TeamAction::Update => "Only team admins can update the team",
            TeamAction::ChangeReviewFrequency => "Only team admins can change the review frequency",
            TeamAction::Invite => "Only team admins can invite members",
            TeamAction::CancelInvitation => "Only team admins can cancel invitations",
            TeamAction::RemoveMember => "Only team admins can remove members",
            TeamAction::ChangeRole => "Only team admins can change member roles",
            TeamAction::Delete => "Only team admins can delete the team",
        }
    }
}

/// Something the caller wants to do.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    /// Any read scoped to the team.
    View,
    Manage(TeamAction),
    CreateOkr(OkrType),
    /// Update or delete the objective, or add, change or remove its key
    /// results.
    ModifyOkr(&'a Okr),
    ReviewOkr(&'a Okr),
    /// Update or delete a review.
    ModifyReview(&'a Review),
}

pub const NOT_A_MEMBER: &str = "You are not a member of this team";
pub const TEAM_OKR_ADMIN_ONLY: &str = "Only team admins can create team OKRs";
pub const PERSONAL_OKR_MEMBERS_ONLY: &str = "Only team admins and members can create personal OKRs";
pub const OKR_OWNER_OR_ADMIN: &str = "Only the OKR owner or a team admin can modify this OKR";
pub const REVIEW_OWNER_OR_ADMIN: &str = "Only the OKR owner or a team admin can review this OKR";
pub const REVIEWER_ONLY: &str = "Only the reviewer can modify this review";

pub fn authorize(subject: &Subject<'_>, action: Action<'_>) -> Decision {
    match action {
        Action::ModifyReview(review) => {
            if review.reviewer_id == subject.user_id {
                Decision::Allow
            } else {
                Decision::Deny(REVIEWER_ONLY)
            }
        }
        _ if subject.role.is_none() => Decision::Deny(NOT_A_MEMBER),
        Action::View => Decision::Allow,
        Action::Manage(team_action) => admin_only(subject, team_action.denial()),
        Action::CreateOkr(OkrType::Team) => admin_only(subject, TEAM_OKR_ADMIN_ONLY),
        Action::CreateOkr(OkrType::Personal) => match subject.role {
            Some(TeamRole::Admin | TeamRole::Member) => Decision::Allow,
            _ => Decision::Deny(PERSONAL_OKR_MEMBERS_ONLY),
        },
        Action::ModifyOkr(okr) => owner_or_admin(subject, okr, OKR_OWNER_OR_ADMIN),
        Action::ReviewOkr(okr) => owner_or_admin(subject, okr, REVIEW_OWNER_OR_ADMIN),
    }
}

fn admin_only(subject: &Subject<'_>, reason: &'static str) -> Decision {
    if subject.is_admin() {
        Decision::Allow
    } else {
        Decision::Deny(reason)
    }
}

/// Ownerless objectives fall through to the admin check.
fn owner_or_admin(subject: &Subject<'_>, okr: &Okr, reason: &'static str) -> Decision {
    let is_owner = okr.owner_id.as_deref() == Some(subject.user_id);
    if is_owner || subject.is_admin() {
        Decision::Allow
    } else {
        Decision::Deny(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewType;

    impl Decision {
        fn is_allowed(&self) -> bool {
            matches!(self, Decision::Allow)
        }
    }

    const ALICE: &str = "alice";
    const BOB: &str = "bob";

    fn okr(okr_type: OkrType, owner: Option<&str>) -> Okr {
        Okr {
            id: "okr-1".to_string(),
            title: "Ship v2".to_string(),
            description: None,
            okr_type,
            team_id: "team-1".to_string(),
            owner_id: owner.map(str::to_string),
            year: 2025,
            quarter: 1,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn review(reviewer: &str) -> Review {
        Review {
            id: "review-1".to_string(),
            okr_id: "okr-1".to_string(),
            review_type: ReviewType::Progress,
            content: "On track".to_string(),
            reviewer_id: reviewer.to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    const ROLES: [Option<TeamRole>; 4] = [
        Some(TeamRole::Admin),
        Some(TeamRole::Member),
        Some(TeamRole::Viewer),
        None,
    ];

    #[test]
    fn test_okr_creation_matrix() {
        for role in ROLES {
            let subject = Subject::new(ALICE, role);
            let team = authorize(&subject, Action::CreateOkr(OkrType::Team));
            let personal = authorize(&subject, Action::CreateOkr(OkrType::Personal));
            match role {
                Some(TeamRole::Admin) => {
                    assert!(team.is_allowed());
                    assert!(personal.is_allowed());
                }
                Some(TeamRole::Member) => {
                    assert_eq!(team, Decision::Deny(TEAM_OKR_ADMIN_ONLY));
                    assert!(personal.is_allowed());
                }
                Some(TeamRole::Viewer) => {
                    assert_eq!(team, Decision::Deny(TEAM_OKR_ADMIN_ONLY));
                    assert_eq!(personal, Decision::Deny(PERSONAL_OKR_MEMBERS_ONLY));
                }
                None => {
                    assert_eq!(team, Decision::Deny(NOT_A_MEMBER));
                    assert_eq!(personal, Decision::Deny(NOT_A_MEMBER));
                }
            }
        }
    }

    #[test]
    fn test_team_management_is_admin_only() {
        let actions = [
            TeamAction::Update,
            TeamAction::ChangeReviewFrequency,
            TeamAction::Invite,
            TeamAction::CancelInvitation,
            TeamAction::RemoveMember,
            TeamAction::ChangeRole,
            TeamAction::Delete,
        ];
        for action in actions {
            for role in ROLES {
                let decision = authorize(&Subject::new(ALICE, role), Action::Manage(action));
                assert_eq!(decision.is_allowed(), role == Some(TeamRole::Admin));
            }
        }
    }

    #[test]
    fn test_view_requires_membership() {
        assert!(authorize(&Subject::new(ALICE, Some(TeamRole::Viewer)), Action::View).is_allowed());
        assert_eq!(
            authorize(&Subject::new(ALICE, None), Action::View),
            Decision::Deny(NOT_A_MEMBER)
        );
    }

    #[test]
    fn test_owner_or_admin_modifies_okr() {
        let owned = okr(OkrType::Personal, Some(ALICE));
        assert!(authorize(&Subject::new(ALICE, Some(TeamRole::Viewer)), Action::ModifyOkr(&owned)).is_allowed());
        assert!(authorize(&Subject::new(BOB, Some(TeamRole::Admin)), Action::ModifyOkr(&owned)).is_allowed());
        assert_eq!(
            authorize(&Subject::new(BOB, Some(TeamRole::Member)), Action::ModifyOkr(&owned)),
            Decision::Deny(OKR_OWNER_OR_ADMIN)
        );
    }

    #[test]
    fn test_owner_outside_team_cannot_modify() {
        let owned = okr(OkrType::Personal, Some(ALICE));
        assert_eq!(
            authorize(&Subject::new(ALICE, None), Action::ModifyOkr(&owned)),
            Decision::Deny(NOT_A_MEMBER)
        );
    }

    #[test]
    fn test_ownerless_okr_reviews_are_admin_only() {
        let ownerless = okr(OkrType::Team, None);
        for role in ROLES {
            let decision = authorize(&Subject::new(ALICE, role), Action::ReviewOkr(&ownerless));
            assert_eq!(decision.is_allowed(), role == Some(TeamRole::Admin));
        }
    }

    #[test]
    fn test_owner_may_review_own_okr() {
        let owned = okr(OkrType::Team, Some(ALICE));
        assert!(authorize(&Subject::new(ALICE, Some(TeamRole::Member)), Action::ReviewOkr(&owned)).is_allowed());
        assert_eq!(
            authorize(&Subject::new(BOB, Some(TeamRole::Member)), Action::ReviewOkr(&owned)),
            Decision::Deny(REVIEW_OWNER_OR_ADMIN)
        );
    }

    #[test]
    fn test_only_reviewer_modifies_review() {
        let written = review(ALICE);
        assert!(authorize(&Subject::new(ALICE, None), Action::ModifyReview(&written)).is_allowed());
        assert_eq!(
            authorize(&Subject::new(BOB, Some(TeamRole::Admin)), Action::ModifyReview(&written)),
            Decision::Deny(REVIEWER_ONLY)
        );
    }

    #[test]
    fn test_denial_maps_to_forbidden() {
        let err = Decision::Deny(REVIEWER_ONLY).into_result().unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == REVIEWER_ONLY));
        assert!(Decision::Allow.into_result().is_ok());
    }
}
