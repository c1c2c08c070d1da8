//! RBAC guard — pure (role, scope) → capability checks.
//!
//! Consulted by the engine before every mutation. Super-admins
//! (`PlatformAdmin`, `CenterAdmin`) hold every administrative capability
//! regardless of scope. Project capabilities are team-bound: they require
//! a `TeamLead` whose scope matches, because the acting team is always
//! resolved from the actor's scope.

use uuid::Uuid;

use crate::models::actor::{Actor, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Assign, remove or swap server→field bindings. Global scope.
    AssignServers,
    /// Create or update a department quota. Scoped to the owning field.
    SetDepartmentQuota,
    /// Create or update a team quota. Scoped to the owning department.
    SetTeamQuota,
    /// Create a project. Scoped to the acting team.
    CreateProject,
    /// Delete a project. Scoped to the owning team.
    DeleteProject,
}

/// Super-admins bypass all scoped checks for administrative capabilities.
pub fn is_super_admin(actor: &Actor) -> bool {
    matches!(actor.role, Role::PlatformAdmin | Role::CenterAdmin)
}

/// Whether `actor` may exercise `capability` against the node `scope_id`.
///
/// `scope_id` is `None` for global operations (server assignment).
pub fn has_scoped_capability(
    actor: &Actor,
    capability: Capability,
    scope_id: Option<Uuid>,
) -> bool {
    match (actor.role, capability) {
        (
            Role::PlatformAdmin | Role::CenterAdmin,
            Capability::AssignServers | Capability::SetDepartmentQuota | Capability::SetTeamQuota,
        ) => true,
        (Role::FieldAdmin, Capability::SetDepartmentQuota)
        | (Role::DeptAdmin, Capability::SetTeamQuota)
        | (Role::TeamLead, Capability::CreateProject | Capability::DeleteProject) => {
            actor.scope_id.is_some() && actor.scope_id == scope_id
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, scope: Option<Uuid>) -> Actor {
        Actor::new("tester", role, scope)
    }

    #[test]
    fn super_admins_hold_admin_capabilities_unscoped() {
        for role in [Role::PlatformAdmin, Role::CenterAdmin] {
            let a = actor(role, None);
            assert!(is_super_admin(&a));
            assert!(has_scoped_capability(&a, Capability::AssignServers, None));
            assert!(has_scoped_capability(
                &a,
                Capability::SetDepartmentQuota,
                Some(Uuid::new_v4())
            ));
            assert!(has_scoped_capability(
                &a,
                Capability::SetTeamQuota,
                Some(Uuid::new_v4())
            ));
        }
    }

    #[test]
    fn super_admins_do_not_hold_team_bound_project_capabilities() {
        let a = actor(Role::PlatformAdmin, None);
        assert!(!has_scoped_capability(
            &a,
            Capability::CreateProject,
            Some(Uuid::new_v4())
        ));
    }

    #[test]
    fn field_admin_scope_must_match_exactly() {
        let field = Uuid::new_v4();
        let a = actor(Role::FieldAdmin, Some(field));
        assert!(has_scoped_capability(&a, Capability::SetDepartmentQuota, Some(field)));
        assert!(!has_scoped_capability(
            &a,
            Capability::SetDepartmentQuota,
            Some(Uuid::new_v4())
        ));
        assert!(!has_scoped_capability(&a, Capability::SetTeamQuota, Some(field)));
        assert!(!has_scoped_capability(&a, Capability::AssignServers, None));
    }

    #[test]
    fn team_lead_only_acts_on_own_team() {
        let team = Uuid::new_v4();
        let a = actor(Role::TeamLead, Some(team));
        assert!(has_scoped_capability(&a, Capability::CreateProject, Some(team)));
        assert!(has_scoped_capability(&a, Capability::DeleteProject, Some(team)));
        assert!(!has_scoped_capability(
            &a,
            Capability::DeleteProject,
            Some(Uuid::new_v4())
        ));
    }

    #[test]
    fn missing_scope_never_matches() {
        let a = actor(Role::DeptAdmin, None);
        assert!(!has_scoped_capability(&a, Capability::SetTeamQuota, None));
    }
}
