//! Static permission catalog and built-in role table.
//!
//! Both are seeded into the store once at process start; the API never
//! mutates them afterwards.

/// (name, description, resource, action)
pub const PERMISSIONS: &[(&str, &str, &str, &str)] = &[
    ("read:user", "View tenant users", "user", "read"),
    ("write:user", "Create and modify tenant users", "user", "write"),
    ("delete:user", "Delete tenant users", "user", "delete"),
    ("read:service", "View proxy services", "service", "read"),
    ("write:service", "Create and modify proxy services", "service", "write"),
    ("delete:service", "Delete proxy services", "service", "delete"),
    ("read:domain", "View domains and certificates", "domain", "read"),
    ("write:domain", "Create and modify domains", "domain", "write"),
    ("delete:domain", "Delete domains", "domain", "delete"),
    ("read:backup", "View backups", "backup", "read"),
    ("write:backup", "Create and restore backups", "backup", "write"),
    ("delete:backup", "Delete backups", "backup", "delete"),
    ("read:webhook", "View webhooks and delivery logs", "webhook", "read"),
    ("write:webhook", "Create and modify webhooks", "webhook", "write"),
    ("delete:webhook", "Delete webhooks", "webhook", "delete"),
    ("read:role", "View roles and permissions", "role", "read"),
    ("write:role", "Create and modify roles", "role", "write"),
    ("delete:role", "Delete roles", "role", "delete"),
    ("read:admin", "View administrator accounts", "admin", "read"),
    ("write:admin", "Manage administrator accounts", "admin", "write"),
    ("read:system", "View system status", "system", "read"),
    ("write:system", "Change system settings", "system", "write"),
];

pub struct BuiltinRole {
    pub name: &'static str,
    pub description: &'static str,
    /// Permission names; an empty list means every catalog entry.
    pub permissions: &'static [&'static str],
}

/// Built-in roles created at bootstrap. The `admin` role is the one the
/// last-admin-standing guard protects.
pub const BUILTIN_ROLES: &[BuiltinRole] = &[
    BuiltinRole {
        name: "admin",
        description: "Full access to every resource",
        permissions: &[],
    },
    BuiltinRole {
        name: "operator",
        description: "Day-to-day operation without role or admin management",
        permissions: &[
            "read:user", "write:user",
            "read:service", "write:service",
            "read:domain", "write:domain",
            "read:backup", "write:backup",
            "read:webhook", "write:webhook",
            "read:system",
        ],
    },
    BuiltinRole {
        name: "viewer",
        description: "Read-only access",
        permissions: &[
            "read:user", "read:service", "read:domain",
            "read:backup", "read:webhook", "read:role",
            "read:admin", "read:system",
        ],
    },
];

/// Resolve a built-in role's permission names against the catalog.
pub fn builtin_role_permissions(role: &BuiltinRole) -> Vec<&'static str> {
    if role.permissions.is_empty() {
        PERMISSIONS.iter().map(|(name, ..)| *name).collect()
    } else {
        role.permissions.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_no_duplicate_names() {
        let mut names: Vec<_> = PERMISSIONS.iter().map(|(name, ..)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PERMISSIONS.len());
    }

    #[test]
    fn test_permission_names_encode_action_and_resource() {
        for (name, _, resource, action) in PERMISSIONS {
            assert_eq!(*name, format!("{action}:{resource}"));
        }
    }

    #[test]
    fn test_builtin_roles_reference_known_permissions() {
        for role in BUILTIN_ROLES {
            for perm in builtin_role_permissions(role) {
                assert!(
                    PERMISSIONS.iter().any(|(name, ..)| *name == perm),
                    "role {} references unknown permission {}",
                    role.name,
                    perm
                );
            }
        }
    }

    #[test]
    fn test_admin_role_covers_whole_catalog() {
        let admin = BUILTIN_ROLES.iter().find(|r| r.name == "admin").unwrap();
        assert_eq!(builtin_role_permissions(admin).len(), PERMISSIONS.len());
    }
}
