//! Role registry and admin identity directory.
//!
//! Enforces the RBAC invariants at the storage boundary: built-in roles are
//! immutable and undeletable, a role referenced by any admin user cannot be
//! deleted, and the last active holder of the `admin` role cannot be
//! disabled. Check-then-act sequences run inside a single transaction with
//! the affected row locked.

use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{
    AdminPermission, AdminRole, AdminUser, AdminUserWithRole, RoleWithPermissions,
};
use crate::rbac::catalog::{self, BUILTIN_ROLES, PERMISSIONS};

/// The role name the last-admin-standing guard protects.
const ADMIN_ROLE_NAME: &str = "admin";

#[derive(Error, Debug)]
pub enum RbacError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Operation refused: {0}")]
    NotAllowed(String),
    #[error("Unknown permission ids: {0:?}")]
    UnknownPermissions(Vec<String>),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

#[derive(Clone)]
pub struct RbacService {
    db_pool: PgPool,
}

impl RbacService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    // ---- bootstrap seeding -------------------------------------------------

    /// Seed the permission catalog. Idempotent: existing rows are left alone.
    pub async fn init_permissions(&self) -> Result<(), RbacError> {
        for (name, description, resource, action) in PERMISSIONS {
            sqlx::query(
                r#"
                INSERT INTO admin_permissions (id, name, description, resource, action)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(name)
            .bind(description)
            .bind(resource)
            .bind(action)
            .execute(&self.db_pool)
            .await?;
        }
        tracing::info!(count = PERMISSIONS.len(), "permission catalog seeded");
        Ok(())
    }

    /// Seed the built-in roles. Idempotent: a role whose name already exists
    /// keeps its current permission set untouched.
    pub async fn init_builtin_roles(&self) -> Result<(), RbacError> {
        for builtin in BUILTIN_ROLES {
            let existing = sqlx::query_as::<_, AdminRole>(
                "SELECT * FROM admin_roles WHERE name = $1",
            )
            .bind(builtin.name)
            .fetch_optional(&self.db_pool)
            .await?;
            if existing.is_some() {
                continue;
            }

            let mut tx = self.db_pool.begin().await?;
            let role_id = Uuid::new_v4().to_string();

            sqlx::query(
                r#"
                INSERT INTO admin_roles (id, name, description, is_builtin, created_at)
                VALUES ($1, $2, $3, TRUE, $4)
                "#,
            )
            .bind(&role_id)
            .bind(builtin.name)
            .bind(builtin.description)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

            for perm_name in catalog::builtin_role_permissions(builtin) {
                sqlx::query(
                    r#"
                    INSERT INTO admin_role_permissions (role_id, permission_id)
                    SELECT $1, id FROM admin_permissions WHERE name = $2
                    "#,
                )
                .bind(&role_id)
                .bind(perm_name)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            tracing::info!(role = builtin.name, "built-in role created");
        }
        Ok(())
    }

    // ---- permissions -------------------------------------------------------

    pub async fn list_permissions(&self) -> Result<Vec<AdminPermission>, RbacError> {
        Ok(sqlx::query_as::<_, AdminPermission>(
            "SELECT * FROM admin_permissions ORDER BY resource, action",
        )
        .fetch_all(&self.db_pool)
        .await?)
    }

    async fn permissions_for_role<'e, E>(
        executor: E,
        role_id: &str,
    ) -> Result<Vec<AdminPermission>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, AdminPermission>(
            r#"
            SELECT p.* FROM admin_permissions p
            JOIN admin_role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(role_id)
        .fetch_all(executor)
        .await
    }

    // ---- roles -------------------------------------------------------------

    pub async fn list_roles(&self) -> Result<Vec<RoleWithPermissions>, RbacError> {
        let roles = sqlx::query_as::<_, AdminRole>("SELECT * FROM admin_roles ORDER BY name")
            .fetch_all(&self.db_pool)
            .await?;

        let mut out = Vec::with_capacity(roles.len());
        for role in roles {
            let permissions = Self::permissions_for_role(&self.db_pool, &role.id).await?;
            out.push(RoleWithPermissions { role, permissions });
        }
        Ok(out)
    }

    pub async fn get_role(&self, role_id: &str) -> Result<RoleWithPermissions, RbacError> {
        let role = sqlx::query_as::<_, AdminRole>("SELECT * FROM admin_roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| RbacError::NotFound(format!("role {role_id}")))?;

        let permissions = Self::permissions_for_role(&self.db_pool, &role.id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    /// Create a custom role. Unknown permission ids fail the whole call so a
    /// typo cannot silently produce an under-privileged role.
    pub async fn create_role(
        &self,
        name: &str,
        description: Option<&str>,
        permission_ids: &[String],
    ) -> Result<RoleWithPermissions, RbacError> {
        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_roles WHERE name = $1")
                .bind(name)
                .fetch_one(&self.db_pool)
                .await?;
        if existing > 0 {
            return Err(RbacError::Conflict(format!("role {name}")));
        }

        let mut tx = self.db_pool.begin().await?;
        let role_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO admin_roles (id, name, description, is_builtin, created_at)
            VALUES ($1, $2, $3, FALSE, $4)
            "#,
        )
        .bind(&role_id)
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let unknown = Self::link_permissions(&mut tx, &role_id, permission_ids).await?;
        if !unknown.is_empty() {
            tx.rollback().await?;
            return Err(RbacError::UnknownPermissions(unknown));
        }

        let permissions = Self::permissions_for_role(&mut *tx, &role_id).await?;
        let role = sqlx::query_as::<_, AdminRole>("SELECT * FROM admin_roles WHERE id = $1")
            .bind(&role_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(role = name, "role created");
        Ok(RoleWithPermissions { role, permissions })
    }

    /// Replace a custom role's entire permission set. Refused for built-in
    /// roles; fully rolled back when any permission id does not resolve.
    pub async fn update_role_permissions(
        &self,
        role_id: &str,
        permission_ids: &[String],
    ) -> Result<RoleWithPermissions, RbacError> {
        let mut tx = self.db_pool.begin().await?;

        let role = sqlx::query_as::<_, AdminRole>(
            "SELECT * FROM admin_roles WHERE id = $1 FOR UPDATE",
        )
        .bind(role_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RbacError::NotFound(format!("role {role_id}")))?;

        if role.is_builtin {
            return Err(RbacError::NotAllowed(format!(
                "built-in role {} cannot be modified",
                role.name
            )));
        }

        sqlx::query("DELETE FROM admin_role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        let unknown = Self::link_permissions(&mut tx, role_id, permission_ids).await?;
        if !unknown.is_empty() {
            tx.rollback().await?;
            return Err(RbacError::UnknownPermissions(unknown));
        }

        let permissions = Self::permissions_for_role(&mut *tx, role_id).await?;
        tx.commit().await?;

        tracing::info!(role = %role.name, "role permissions replaced");
        Ok(RoleWithPermissions { role, permissions })
    }

    /// Delete a custom role. The in-use check and the delete share one
    /// transaction with the role row locked, so a concurrent assignment
    /// cannot slip between them.
    pub async fn delete_role(&self, role_id: &str) -> Result<(), RbacError> {
        let mut tx = self.db_pool.begin().await?;

        let role = sqlx::query_as::<_, AdminRole>(
            "SELECT * FROM admin_roles WHERE id = $1 FOR UPDATE",
        )
        .bind(role_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RbacError::NotFound(format!("role {role_id}")))?;

        if role.is_builtin {
            return Err(RbacError::NotAllowed(format!(
                "built-in role {} cannot be deleted",
                role.name
            )));
        }

        let user_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_users WHERE role_id = $1")
                .bind(role_id)
                .fetch_one(&mut *tx)
                .await?;
        if user_count > 0 {
            return Err(RbacError::NotAllowed(format!(
                "role {} is assigned to {user_count} user(s)",
                role.name
            )));
        }

        sqlx::query("DELETE FROM admin_role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM admin_roles WHERE id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(role = %role.name, "role deleted");
        Ok(())
    }

    /// Insert role->permission links, returning the ids that did not resolve.
    async fn link_permissions(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        role_id: &str,
        permission_ids: &[String],
    ) -> Result<Vec<String>, RbacError> {
        let mut unknown = Vec::new();
        for perm_id in permission_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO admin_role_permissions (role_id, permission_id)
                SELECT $1, id FROM admin_permissions WHERE id = $2
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role_id)
            .bind(perm_id)
            .execute(&mut **tx)
            .await?;
            if result.rows_affected() == 0 {
                unknown.push(perm_id.clone());
            }
        }
        Ok(unknown)
    }

    // ---- admin users -------------------------------------------------------

    pub async fn list_admin_users(&self) -> Result<Vec<AdminUser>, RbacError> {
        Ok(
            sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users ORDER BY username")
                .fetch_all(&self.db_pool)
                .await?,
        )
    }

    pub async fn create_admin_user(
        &self,
        username: &str,
        password: &str,
        role_id: &str,
    ) -> Result<AdminUser, RbacError> {
        let taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_users WHERE username = $1")
                .bind(username)
                .fetch_one(&self.db_pool)
                .await?;
        if taken > 0 {
            return Err(RbacError::Conflict(format!("username {username}")));
        }

        let role_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_roles WHERE id = $1")
                .bind(role_id)
                .fetch_one(&self.db_pool)
                .await?;
        if role_exists == 0 {
            return Err(RbacError::NotFound(format!("role {role_id}")));
        }

        let password_hash =
            hash(password, DEFAULT_COST).map_err(|e| RbacError::PasswordHash(e.to_string()))?;

        let user = sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users (id, username, password_hash, role_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(username)
        .bind(&password_hash)
        .bind(role_id)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(username, "admin user created");
        Ok(user)
    }

    pub async fn assign_role(&self, user_id: &str, role_id: &str) -> Result<AdminUser, RbacError> {
        let role_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_roles WHERE id = $1")
                .bind(role_id)
                .fetch_one(&self.db_pool)
                .await?;
        if role_exists == 0 {
            return Err(RbacError::NotFound(format!("role {role_id}")));
        }

        let user = sqlx::query_as::<_, AdminUser>(
            "UPDATE admin_users SET role_id = $2 WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| RbacError::NotFound(format!("user {user_id}")))?;

        tracing::info!(username = %user.username, role_id, "role assigned");
        Ok(user)
    }

    pub async fn enable_user(&self, user_id: &str) -> Result<AdminUser, RbacError> {
        let user = sqlx::query_as::<_, AdminUser>(
            "UPDATE admin_users SET is_active = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| RbacError::NotFound(format!("user {user_id}")))?;

        tracing::info!(username = %user.username, "admin user enabled");
        Ok(user)
    }

    /// Disable an admin account. Refused when the target is the last active
    /// holder of the `admin` role; the count and the update share one
    /// transaction so two concurrent disables cannot both pass the guard.
    pub async fn disable_user(&self, user_id: &str) -> Result<AdminUser, RbacError> {
        let mut tx = self.db_pool.begin().await?;

        let user = sqlx::query_as::<_, AdminUser>(
            "SELECT * FROM admin_users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RbacError::NotFound(format!("user {user_id}")))?;

        if let Some(role_id) = &user.role_id {
            let role_name =
                sqlx::query_scalar::<_, String>("SELECT name FROM admin_roles WHERE id = $1")
                    .bind(role_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            if role_name.as_deref() == Some(ADMIN_ROLE_NAME) {
                let other_active = sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*) FROM admin_users
                    WHERE role_id = $1 AND id <> $2 AND is_active = TRUE
                    "#,
                )
                .bind(role_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

                if other_active == 0 {
                    return Err(RbacError::NotAllowed(
                        "cannot disable the last active admin account".to_string(),
                    ));
                }
            }
        }

        let user = sqlx::query_as::<_, AdminUser>(
            "UPDATE admin_users SET is_active = FALSE WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(username = %user.username, "admin user disabled");
        Ok(user)
    }

    // ---- identity loading --------------------------------------------------

    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, RbacError> {
        Ok(
            sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.db_pool)
                .await?,
        )
    }

    /// Load a principal with its role and permission set for authorization
    /// decisions.
    pub async fn load_principal(&self, user_id: &str) -> Result<AdminUserWithRole, RbacError> {
        let user = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| RbacError::NotFound(format!("user {user_id}")))?;

        let role = match &user.role_id {
            Some(role_id) => {
                let role =
                    sqlx::query_as::<_, AdminRole>("SELECT * FROM admin_roles WHERE id = $1")
                        .bind(role_id)
                        .fetch_optional(&self.db_pool)
                        .await?;
                match role {
                    Some(role) => {
                        let permissions =
                            Self::permissions_for_role(&self.db_pool, &role.id).await?;
                        Some(RoleWithPermissions { role, permissions })
                    }
                    None => None,
                }
            }
            None => None,
        };

        Ok(AdminUserWithRole { user, role })
    }

    pub async fn touch_last_login(&self, user_id: &str) -> Result<(), RbacError> {
        sqlx::query("UPDATE admin_users SET last_login = $2 WHERE id = $1")
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }
}
