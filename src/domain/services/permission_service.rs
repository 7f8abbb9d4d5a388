//! Permission calculation domain service.

use crate::domain::entities::RoleAssignment;
use crate::domain::value_objects::{Permissions, Scope};

/// Domain service for calculating and validating permissions.
pub struct PermissionService;

impl PermissionService {
    /// Whether any assignment is a global super admin grant.
    pub fn is_super_admin(assignments: &[RoleAssignment]) -> bool {
        assignments.iter().any(RoleAssignment::is_global_super_admin)
    }

    /// Effective permissions of a user in one tenant.
    ///
    /// Each assignment contributes its role defaults adjusted by its own
    /// allow/deny bits; contributions are OR-ed. Administrator expands to all.
    pub fn effective_permissions(assignments: &[RoleAssignment], tenant_id: i64) -> i64 {
        if Self::is_super_admin(assignments) {
            return Permissions::ALL;
        }

        let permissions = assignments
            .iter()
            .filter(|a| a.applies_to(tenant_id))
            .fold(0i64, |acc, a| {
                acc | Permissions::from_bits(a.role.default_permissions())
                    .apply_overrides(a.allow, a.deny)
                    .bits()
            });

        if permissions & Permissions::ADMINISTRATOR != 0 {
            return Permissions::ALL;
        }

        permissions
    }

    /// Decide a check from already-computed effective permissions.
    pub fn allows(effective: i64, user_id: i64, required: i64, scope: Scope) -> bool {
        let permissions = Permissions::from_bits(effective);
        if permissions.is_admin() {
            return true;
        }
        if effective & required != required {
            return false;
        }
        match scope {
            Scope::Tenant { .. } => true,
            Scope::Record { owner_id, .. } if owner_id == user_id => true,
            Scope::Record { .. } => effective & Permissions::ACCESS_ALL_RECORDS != 0,
        }
    }

    /// Check whether a user may perform an action requiring `required`.
    pub fn check(
        assignments: &[RoleAssignment],
        user_id: i64,
        required: i64,
        scope: Scope,
    ) -> bool {
        if Self::is_super_admin(assignments) {
            return true;
        }
        let effective = Self::effective_permissions(assignments, scope.tenant_id());
        Self::allows(effective, user_id, required, scope)
    }

    /// Whether listings must be restricted to the user's own records.
    pub fn own_records_only(effective: i64) -> bool {
        let permissions = Permissions::from_bits(effective);
        !permissions.is_admin() && effective & Permissions::ACCESS_ALL_RECORDS == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Role;
    use chrono::Utc;

    fn assignment(role: Role, tenant_id: Option<i64>, allow: i64, deny: i64) -> RoleAssignment {
        RoleAssignment {
            id: 1,
            user_id: 7,
            tenant_id,
            role,
            allow,
            deny,
            created_at: Utc::now(),
        }
    }

    const TENANT: Scope = Scope::Tenant { tenant_id: 1 };

    #[test]
    fn test_global_super_admin_passes_everywhere() {
        let assignments = vec![assignment(Role::SuperAdmin, None, 0, 0)];
        assert!(PermissionService::check(
            &assignments,
            7,
            Permissions::MANAGE_USERS,
            Scope::Record {
                tenant_id: 99,
                owner_id: 3
            }
        ));
    }

    #[test]
    fn test_tenant_admin_is_administrator_only_in_its_tenant() {
        let assignments = vec![assignment(Role::TenantAdmin, Some(1), 0, 0)];
        assert!(PermissionService::check(&assignments, 7, Permissions::MANAGE_USERS, TENANT));
        assert!(!PermissionService::check(
            &assignments,
            7,
            Permissions::VIEW_FORMS,
            Scope::Tenant { tenant_id: 2 }
        ));
    }

    #[test]
    fn test_worker_needs_all_required_bits() {
        let assignments = vec![assignment(Role::Worker, Some(1), 0, 0)];
        assert!(PermissionService::check(&assignments, 7, Permissions::EDIT_FORMS, TENANT));
        assert!(!PermissionService::check(
            &assignments,
            7,
            Permissions::EDIT_FORMS | Permissions::APPROVE_FORMS,
            TENANT
        ));
    }

    #[test]
    fn test_record_scope_requires_ownership_or_access_all() {
        let worker = vec![assignment(Role::Worker, Some(1), 0, 0)];
        let own = Scope::Record {
            tenant_id: 1,
            owner_id: 7,
        };
        let other = Scope::Record {
            tenant_id: 1,
            owner_id: 8,
        };
        assert!(PermissionService::check(&worker, 7, Permissions::VIEW_FORMS, own));
        assert!(!PermissionService::check(&worker, 7, Permissions::VIEW_FORMS, other));

        let supervisor = vec![assignment(Role::Supervisor, Some(1), 0, 0)];
        assert!(PermissionService::check(&supervisor, 7, Permissions::VIEW_FORMS, other));
    }

    #[test]
    fn test_deny_removes_role_default() {
        let assignments = vec![assignment(Role::Supervisor, Some(1), 0, Permissions::ISSUE_PERMITS)];
        assert!(!PermissionService::check(&assignments, 7, Permissions::ISSUE_PERMITS, TENANT));
    }

    #[test]
    fn test_allow_adds_bits_and_assignments_combine() {
        let assignments = vec![
            assignment(Role::Worker, Some(1), Permissions::VIEW_BILLING, 0),
            assignment(Role::Auditor, Some(1), 0, 0),
        ];
        let effective = PermissionService::effective_permissions(&assignments, 1);
        assert!(effective & Permissions::VIEW_BILLING != 0);
        assert!(effective & Permissions::VIEW_AUDIT_LOG != 0);
        assert!(effective & Permissions::EDIT_FORMS != 0);
        assert!(!PermissionService::own_records_only(effective));
    }

    #[test]
    fn test_worker_lists_own_records_only() {
        let assignments = vec![assignment(Role::Worker, Some(1), 0, 0)];
        let effective = PermissionService::effective_permissions(&assignments, 1);
        assert!(PermissionService::own_records_only(effective));
    }

    #[test]
    fn test_no_assignment_denies() {
        assert!(!PermissionService::check(&[], 7, Permissions::VIEW_FORMS, TENANT));
    }
}
