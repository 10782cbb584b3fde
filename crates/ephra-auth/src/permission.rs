//! Permission predicates over a [`Principal`].
//!
//! Everything here is pure. Checks that depend on stored relationships
//! (e.g. whether a user is assigned to a provider) report which rule
//! granted access and leave the lookup to the caller.

use ephra_core::ServiceError;

use crate::principal::Principal;
use crate::scopes;

/// Exact membership of `scope` in the principal's scope set.
pub fn has_scope(principal: &Principal, scope: &str) -> bool {
    principal.has_scope(scope)
}

/// `true` iff at least one of `required` is held. An empty set never passes.
pub fn has_any(principal: &Principal, required: &[&str]) -> bool {
    required.iter().any(|s| principal.has_scope(s))
}

/// `true` iff every scope in `required` is held. An empty set always passes.
pub fn has_all(principal: &Principal, required: &[&str]) -> bool {
    required.iter().all(|s| principal.has_scope(s))
}

pub fn require_scope(principal: &Principal, scope: &str) -> Result<(), ServiceError> {
    if has_scope(principal, scope) {
        return Ok(());
    }
    tracing::debug!(subject = %principal.subject_id(), scope, "Missing required scope");
    Err(ServiceError::permission(
        format!("Missing required scope: {scope}"),
        [scope],
    ))
}

pub fn require_any(principal: &Principal, required: &[&str]) -> Result<(), ServiceError> {
    if has_any(principal, required) {
        return Ok(());
    }
    tracing::debug!(subject = %principal.subject_id(), ?required, "Missing all alternative scopes");
    Err(ServiceError::permission(
        format!("Requires one of the following scopes: {}", required.join(", ")),
        required.iter().copied(),
    ))
}

/// Fails with the subset of `required` the principal does not hold.
pub fn require_all(principal: &Principal, required: &[&str]) -> Result<(), ServiceError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|s| !principal.has_scope(s))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    tracing::debug!(subject = %principal.subject_id(), ?missing, "Missing required scopes");
    Err(ServiceError::permission(
        format!("Missing required scopes: {}", missing.join(", ")),
        missing,
    ))
}

/// Which ownership rule granted access to another user's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGrant {
    /// The principal is the target user.
    Own,
    /// The principal may act on users assigned to them. The caller still
    /// owes an assignment lookup.
    Assigned,
    /// The principal may act on any user.
    Admin,
}

impl AccessGrant {
    /// `true` when the grant is conditional on an assignment lookup.
    pub fn needs_assignment_check(self) -> bool {
        matches!(self, Self::Assigned)
    }
}

/// Evaluates the self / admin / assigned rules for reading a user's data.
///
/// Self-access wins over admin, admin over assigned, so the returned
/// grant is always the least conditional one available.
pub fn user_data_access(principal: &Principal, target_user_id: &str) -> Option<AccessGrant> {
    if principal.is_self(target_user_id) {
        Some(AccessGrant::Own)
    } else if principal.has_scope(scopes::MANAGE_ALL_USERS) {
        Some(AccessGrant::Admin)
    } else if principal.has_scope(scopes::VIEW_ASSIGNED_USERS) {
        Some(AccessGrant::Assigned)
    } else {
        None
    }
}

pub fn can_access_user_data(principal: &Principal, target_user_id: &str) -> bool {
    user_data_access(principal, target_user_id).is_some()
}

/// Evaluates the appointment-management composite rule.
///
/// Every path requires `create:appointments`; beyond that the principal
/// must be the target, hold `manage:all-users`, or hold
/// `view:assigned-users`.
pub fn appointment_management_grant(
    principal: &Principal,
    target_user_id: &str,
) -> Option<AccessGrant> {
    if !principal.has_scope(scopes::CREATE_APPOINTMENTS) {
        return None;
    }
    if principal.is_self(target_user_id) {
        Some(AccessGrant::Own)
    } else if principal.has_scope(scopes::MANAGE_ALL_USERS) {
        Some(AccessGrant::Admin)
    } else if principal.has_scope(scopes::VIEW_ASSIGNED_USERS) {
        Some(AccessGrant::Assigned)
    } else {
        None
    }
}

pub fn can_manage_appointments_for_user(principal: &Principal, target_user_id: &str) -> bool {
    appointment_management_grant(principal, target_user_id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scopes::{ALL_SCOPES, Role};
    use ephra_core::ErrorKind;

    fn principal(scopes: &[&str]) -> Principal {
        Principal::new("alice").with_scopes(scopes.iter().copied())
    }

    /// Every subset of a small scope universe, as slices.
    fn subsets(universe: &[&'static str]) -> Vec<Vec<&'static str>> {
        (0..(1u32 << universe.len()))
            .map(|mask| {
                universe
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, s)| *s)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_has_all_and_has_any_match_has_scope() {
        let universe = &ALL_SCOPES[..5];
        for held in subsets(universe) {
            let p = principal(&held);
            for required in subsets(universe) {
                assert_eq!(
                    has_all(&p, &required),
                    required.iter().all(|s| has_scope(&p, s)),
                    "has_all {held:?} {required:?}"
                );
                assert_eq!(
                    has_any(&p, &required),
                    required.iter().any(|s| has_scope(&p, s)),
                    "has_any {held:?} {required:?}"
                );
            }
        }
    }

    #[test]
    fn test_empty_requirements() {
        let p = principal(&[]);
        assert!(has_all(&p, &[]));
        assert!(!has_any(&p, &[]));
    }

    #[test]
    fn test_require_all_reports_missing_only() {
        let p = principal(&[scopes::CREATE_APPOINTMENTS]);
        let err = require_all(
            &p,
            &[scopes::CREATE_APPOINTMENTS, scopes::VIEW_ASSIGNED_USERS],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.required_scopes(), [scopes::VIEW_ASSIGNED_USERS.to_string()]);
    }

    #[test]
    fn test_require_scope_and_any() {
        let p = principal(&[scopes::CANCEL_APPOINTMENTS]);
        assert!(require_scope(&p, scopes::CANCEL_APPOINTMENTS).is_ok());
        let err = require_scope(&p, scopes::UPDATE_APPOINTMENTS).unwrap_err();
        assert_eq!(err.required_scopes(), [scopes::UPDATE_APPOINTMENTS.to_string()]);

        assert!(require_any(&p, &[scopes::MANAGE_ALL_USERS, scopes::CANCEL_APPOINTMENTS]).is_ok());
        let err = require_any(&p, &[scopes::MANAGE_ALL_USERS, scopes::VIEW_ASSIGNED_USERS])
            .unwrap_err();
        assert_eq!(err.required_scopes().len(), 2);
    }

    #[test]
    fn test_user_data_access_rules() {
        let p = principal(&[]);
        assert_eq!(user_data_access(&p, "alice"), Some(AccessGrant::Own));
        assert_eq!(user_data_access(&p, "bob"), None);

        let p = principal(&[scopes::VIEW_ASSIGNED_USERS]);
        assert_eq!(user_data_access(&p, "bob"), Some(AccessGrant::Assigned));
        assert!(AccessGrant::Assigned.needs_assignment_check());

        let p = principal(&[scopes::VIEW_ASSIGNED_USERS, scopes::MANAGE_ALL_USERS]);
        assert_eq!(user_data_access(&p, "bob"), Some(AccessGrant::Admin));
        assert!(can_access_user_data(&p, "bob"));
    }

    #[test]
    fn test_create_scope_alone_only_manages_self() {
        let p = principal(&[scopes::CREATE_APPOINTMENTS]);
        assert!(can_manage_appointments_for_user(&p, "alice"));
        assert!(!can_manage_appointments_for_user(&p, "bob"));
    }

    #[test]
    fn test_assigned_view_without_create_cannot_manage() {
        let p = principal(&[scopes::VIEW_ASSIGNED_USERS, scopes::MANAGE_ALL_USERS]);
        assert!(!can_manage_appointments_for_user(&p, "bob"));
        assert!(!can_manage_appointments_for_user(&p, "alice"));
    }

    #[test]
    fn test_manage_composite_matches_formula() {
        let universe = [
            scopes::CREATE_APPOINTMENTS,
            scopes::VIEW_ASSIGNED_USERS,
            scopes::MANAGE_ALL_USERS,
        ];
        for held in subsets(&universe) {
            let p = principal(&held);
            for target in ["alice", "bob"] {
                let create = has_scope(&p, scopes::CREATE_APPOINTMENTS);
                let expected = (p.is_self(target) && create)
                    || (create && has_scope(&p, scopes::VIEW_ASSIGNED_USERS))
                    || (create && has_scope(&p, scopes::MANAGE_ALL_USERS));
                assert_eq!(
                    can_manage_appointments_for_user(&p, target),
                    expected,
                    "{held:?} -> {target}"
                );
            }
        }
    }

    #[test]
    fn test_role_bundles_manage_appointments() {
        let provider = Principal::with_role_scopes("prov", Role::CareProvider);
        assert_eq!(
            appointment_management_grant(&provider, "bob"),
            Some(AccessGrant::Assigned)
        );
        let admin = Principal::with_role_scopes("root", Role::Admin);
        assert_eq!(
            appointment_management_grant(&admin, "bob"),
            Some(AccessGrant::Admin)
        );
        let user = Principal::with_role_scopes("alice", Role::User);
        assert_eq!(appointment_management_grant(&user, "alice"), None);
    }
}
