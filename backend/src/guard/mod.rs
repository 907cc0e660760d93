//! Membership integrity checks.
//!
//! Every team with members keeps at least one admin. These checks run after
//! the policy has allowed the caller and before anything is written.

use tracing::warn;

use crate::db::TeamMemberRepository;
use crate::errors::{AppError, RepoContext};
use crate::models::{TeamMember, TeamRole};

pub const LAST_ADMIN: &str = "Cannot remove the last admin of the team";
pub const TEAM_NOT_EMPTY: &str = "Cannot delete team with other members";

/// A change to one membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    ChangeRole(TeamRole),
    Remove,
}

impl MembershipChange {
    fn drops_admin(&self, current: TeamRole) -> bool {
        current == TeamRole::Admin
            && match self {
                MembershipChange::ChangeRole(role) => *role != TeamRole::Admin,
                MembershipChange::Remove => true,
            }
    }
}

fn admin_count(members: &[TeamMember]) -> usize {
    members.iter().filter(|m| m.role == TeamRole::Admin).count()
}

/// Rejects a change that would leave the member list without an admin.
pub fn check_admin_remains(
    members: &[TeamMember],
    target: &TeamMember,
    change: MembershipChange,
) -> Result<(), AppError> {
    if change.drops_admin(target.role) && admin_count(members) <= 1 {
        return Err(AppError::Conflict(LAST_ADMIN.to_string()));
    }
    Ok(())
}

/// Guard for role changes and removals.
///
/// An admin acting on another admin always leaves at least themselves, so
/// only self-targeted changes need the member list.
pub async fn ensure_admin_remains(
    members: &dyn TeamMemberRepository,
    actor_id: &str,
    target: &TeamMember,
    change: MembershipChange,
) -> Result<(), AppError> {
    if target.user_id != actor_id || !change.drops_admin(target.role) {
        return Ok(());
    }
    let current = members
        .list_members(&target.team_id)
        .await
        .context("Failed to load team members")?;
    check_admin_remains(&current, target, change).inspect_err(|_| {
        warn!(team_id = %target.team_id, user_id = %actor_id, "Refused to drop the last admin");
    })
}

/// A team may only be deleted once its last admin is the sole member.
pub async fn ensure_team_deletable(
    members: &dyn TeamMemberRepository,
    team_id: &str,
) -> Result<(), AppError> {
    let current = members
        .list_members(team_id)
        .await
        .context("Failed to load team members")?;
    if current.len() != 1 {
        return Err(AppError::Conflict(TEAM_NOT_EMPTY.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn member(user_id: &str, role: TeamRole) -> TeamMember {
        TeamMember {
            team_id: "team-1".to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: crate::db::timestamp(),
        }
    }

    #[test]
    fn test_last_admin_cannot_be_demoted_or_removed() {
        let admin = member("alice", TeamRole::Admin);
        let members = vec![admin.clone(), member("bob", TeamRole::Member)];

        for change in [
            MembershipChange::ChangeRole(TeamRole::Member),
            MembershipChange::ChangeRole(TeamRole::Viewer),
            MembershipChange::Remove,
        ] {
            let err = check_admin_remains(&members, &admin, change).unwrap_err();
            assert!(matches!(err, AppError::Conflict(ref m) if m == LAST_ADMIN));
        }
        assert!(check_admin_remains(&members, &admin, MembershipChange::ChangeRole(TeamRole::Admin)).is_ok());
    }

    #[test]
    fn test_second_admin_allows_demotion() {
        let admin = member("alice", TeamRole::Admin);
        let members = vec![admin.clone(), member("bob", TeamRole::Admin)];
        assert!(check_admin_remains(&members, &admin, MembershipChange::Remove).is_ok());
    }

    #[test]
    fn test_non_admin_changes_pass() {
        let viewer = member("carol", TeamRole::Viewer);
        let members = vec![member("alice", TeamRole::Admin), viewer.clone()];
        assert!(check_admin_remains(&members, &viewer, MembershipChange::Remove).is_ok());
    }

    #[tokio::test]
    async fn test_guard_only_loads_for_self_demotion() {
        let store = MemoryStore::new();
        let alice = member("alice", TeamRole::Admin);
        store.add_member(alice.clone()).await.unwrap();

        let err = ensure_admin_remains(&store, "alice", &alice, MembershipChange::Remove)
            .await
            .unwrap_err();
        assert!(err.is_denial());

        // Another admin acting on alice is not the guard's concern.
        assert!(ensure_admin_remains(&store, "bob", &alice, MembershipChange::Remove)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_team_deletable_only_with_single_member() {
        let store = MemoryStore::new();
        store.add_member(member("alice", TeamRole::Admin)).await.unwrap();
        assert!(ensure_team_deletable(&store, "team-1").await.is_ok());

        store.add_member(member("bob", TeamRole::Viewer)).await.unwrap();
        let err = ensure_team_deletable(&store, "team-1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == TEAM_NOT_EMPTY));
    }
}
