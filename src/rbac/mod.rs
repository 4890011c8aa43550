//! Authorization engine: pure permission evaluation over an already-loaded
//! admin identity. No side effects, safe under concurrent invocation.

pub mod catalog;

use crate::db::models::AdminUserWithRole;
use crate::web::error::AppError;

/// True iff the principal is active, has a role, and that role's permission
/// set contains `permission`.
pub fn has_permission(user: &AdminUserWithRole, permission: &str) -> bool {
    if !user.user.is_active {
        return false;
    }
    match &user.role {
        Some(role) => role.permissions.iter().any(|p| p.name == permission),
        None => false,
    }
}

pub fn has_any_permission(user: &AdminUserWithRole, permissions: &[&str]) -> bool {
    permissions.iter().any(|p| has_permission(user, p))
}

pub fn has_all_permissions(user: &AdminUserWithRole, permissions: &[&str]) -> bool {
    permissions.iter().all(|p| has_permission(user, p))
}

/// Guard used at the API boundary: permission denial maps to a forbidden
/// outcome, never to not-found.
pub fn require_permission(user: &AdminUserWithRole, permission: &str) -> Result<(), AppError> {
    if has_permission(user, permission) {
        Ok(())
    } else {
        tracing::warn!(
            username = %user.user.username,
            permission,
            "permission denied"
        );
        Err(AppError::Forbidden(format!(
            "Permission denied. Required: {permission}"
        )))
    }
}

pub fn require_any_permission(
    user: &AdminUserWithRole,
    permissions: &[&str],
) -> Result<(), AppError> {
    if has_any_permission(user, permissions) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Permission denied. Required any of: {}",
            permissions.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AdminPermission, AdminRole, AdminUser, RoleWithPermissions};
    use chrono::Utc;

    fn permission(name: &str) -> AdminPermission {
        let (action, resource) = name.split_once(':').unwrap();
        AdminPermission {
            id: format!("perm-{name}"),
            name: name.to_string(),
            description: None,
            resource: resource.to_string(),
            action: action.to_string(),
        }
    }

    fn principal(active: bool, permissions: Option<&[&str]>) -> AdminUserWithRole {
        let role = permissions.map(|perms| RoleWithPermissions {
            role: AdminRole {
                id: "role-1".to_string(),
                name: "operator".to_string(),
                description: None,
                is_builtin: false,
                created_at: Utc::now(),
            },
            permissions: perms.iter().map(|p| permission(p)).collect(),
        });
        AdminUserWithRole {
            user: AdminUser {
                id: "user-1".to_string(),
                username: "alice".to_string(),
                password_hash: String::new(),
                role_id: role.as_ref().map(|r| r.role.id.clone()),
                is_active: active,
                last_login: None,
                created_at: Utc::now(),
            },
            role,
        }
    }

    #[test]
    fn test_has_permission_requires_membership() {
        let user = principal(true, Some(&["read:user", "write:user"]));
        assert!(has_permission(&user, "read:user"));
        assert!(!has_permission(&user, "delete:user"));
    }

    #[test]
    fn test_inactive_user_has_nothing() {
        let user = principal(false, Some(&["read:user"]));
        assert!(!has_permission(&user, "read:user"));
    }

    #[test]
    fn test_roleless_user_has_nothing() {
        let user = principal(true, None);
        assert!(!has_permission(&user, "read:user"));
    }

    #[test]
    fn test_any_is_or_all_is_and() {
        let user = principal(true, Some(&["read:user"]));
        assert!(has_any_permission(&user, &["read:user", "delete:user"]));
        assert!(!has_any_permission(&user, &["write:user", "delete:user"]));
        assert!(has_all_permissions(&user, &["read:user"]));
        assert!(!has_all_permissions(&user, &["read:user", "delete:user"]));
        assert!(has_all_permissions(&user, &[]));
        assert!(!has_any_permission(&user, &[]));
    }

    #[test]
    fn test_require_permission_is_forbidden_not_notfound() {
        let user = principal(true, Some(&[]));
        match require_permission(&user, "write:role") {
            Err(AppError::Forbidden(_)) => {}
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }
}
