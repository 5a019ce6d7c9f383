// src/db/rbac_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::rbac::{Permission, Role};

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---
    // Permissions
    // ---

    pub async fn insert_permission<'e, E>(
        &self,
        executor: E,
        name: &str,
        slug: &str,
        description: Option<&str>,
        resource: &str,
        action: &str,
    ) -> Result<Permission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (name, slug, description, resource, action)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(resource)
        .bind(action)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateSlug(slug.to_string());
                }
            }
            e.into()
        })
    }

    // Idempotent seeding variant: an existing slug is left untouched so that
    // re-running the bootstrap never clobbers administrator edits.
    pub async fn insert_permission_if_absent<'e, E>(
        &self,
        executor: E,
        name: &str,
        slug: &str,
        description: Option<&str>,
        resource: &str,
        action: &str,
    ) -> Result<Option<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (name, slug, description, resource, action)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(resource)
        .bind(action)
        .fetch_optional(executor)
        .await?;

        Ok(permission)
    }

    pub async fn find_permission_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permission =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(permission)
    }

    pub async fn find_permissions_by_slugs<'e, E>(
        &self,
        executor: E,
        slugs: &[String],
    ) -> Result<Vec<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permissions =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE slug = ANY($1)")
                .bind(slugs)
                .fetch_all(executor)
                .await?;

        Ok(permissions)
    }

    pub async fn find_permissions_by_ids<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permissions =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(executor)
                .await?;

        Ok(permissions)
    }

    pub async fn list_permissions(
        &self,
        is_active: Option<bool>,
        resource: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<Permission>, AppError> {
        // NULL binds disable the corresponding filter; ordering is stable.
        let pattern = search.map(|s| format!("%{}%", s));
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT * FROM permissions
            WHERE ($1::boolean IS NULL OR is_active = $1)
              AND ($2::text IS NULL OR resource = $2)
              AND ($3::text IS NULL
                   OR name ILIKE $3 OR slug ILIKE $3
                   OR resource ILIKE $3 OR action ILIKE $3)
            ORDER BY resource, action
            "#,
        )
        .bind(is_active)
        .bind(resource)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    pub async fn update_permission<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        slug: &str,
        description: Option<&str>,
        resource: &str,
        action: &str,
        is_active: bool,
    ) -> Result<Permission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Permission>(
            r#"
            UPDATE permissions
            SET name = $2, slug = $3, description = $4,
                resource = $5, action = $6, is_active = $7, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(resource)
        .bind(action)
        .bind(is_active)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateSlug(slug.to_string());
                }
            }
            e.into()
        })
    }

    pub async fn delete_permission<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // ---
    // Roles
    // ---

    pub async fn insert_role<'e, E>(
        &self,
        executor: E,
        name: &str,
        slug: &str,
        description: Option<&str>,
        is_system: bool,
        is_admin_role: bool,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, slug, description, is_system, is_admin_role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(is_system)
        .bind(is_admin_role)
        .fetch_one(executor)
        .await
        .map_err(|e| Self::map_role_unique_violation(e, name, slug))
    }

    pub async fn insert_role_if_absent<'e, E>(
        &self,
        executor: E,
        name: &str,
        slug: &str,
        description: Option<&str>,
        is_system: bool,
        is_admin_role: bool,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, slug, description, is_system, is_admin_role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(is_system)
        .bind(is_admin_role)
        .fetch_optional(executor)
        .await?;

        Ok(role)
    }

    pub async fn find_role_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(role)
    }

    // Locks the role row for the rest of the transaction. Association
    // rewrites must serialize per role: under READ COMMITTED, two unlocked
    // delete-then-insert transactions can interleave so that the loser's
    // delete misses the winner's freshly committed rows, leaving a merged
    // permission set instead of last-writer-wins.
    pub async fn find_role_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(role)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(roles)
    }

    pub async fn update_role<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        slug: &str,
        description: Option<&str>,
        is_active: bool,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = $2, slug = $3, description = $4, is_active = $5, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(is_active)
        .fetch_one(executor)
        .await
        .map_err(|e| Self::map_role_unique_violation(e, name, slug))
    }

    pub async fn detach_role_from_users<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE users SET role_id = NULL, updated_at = now() WHERE role_id = $1")
            .bind(role_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_role<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // ---
    // Role <-> Permission associations
    // ---

    pub async fn delete_role_links<'e, E>(&self, executor: E, role_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn delete_permission_links<'e, E>(
        &self,
        executor: E,
        permission_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM role_permissions WHERE permission_id = $1")
            .bind(permission_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Roles currently referencing a permission, granted or revoked.
    pub async fn role_ids_referencing<'e, E>(
        &self,
        executor: E,
        permission_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT role_id FROM role_permissions WHERE permission_id = $1",
        )
        .bind(permission_id)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }

    // Bulk insert via UNNEST; the unique (role_id, permission_id) constraint
    // makes a concurrent duplicate an upsert back to granted.
    pub async fn grant_permissions<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id, granted)
            SELECT $1, unnest($2::uuid[]), TRUE
            ON CONFLICT (role_id, permission_id) DO UPDATE SET granted = TRUE
            "#,
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Marks a single association as revoked without deleting it.
    pub async fn revoke_permission<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE role_permissions SET granted = FALSE WHERE role_id = $1 AND permission_id = $2",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn granted_permissions<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
    ) -> Result<Vec<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.*
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1 AND rp.granted = TRUE
            ORDER BY p.resource, p.action
            "#,
        )
        .bind(role_id)
        .fetch_all(executor)
        .await?;

        Ok(permissions)
    }

    pub async fn granted_slugs<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
    ) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slugs = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.slug
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1 AND rp.granted = TRUE
            "#,
        )
        .bind(role_id)
        .fetch_all(executor)
        .await?;

        Ok(slugs)
    }

    // Recomputes the denormalized slug array on the role row from the join
    // table. Called inside the same transaction as any association write.
    pub async fn refresh_role_slugs<'e, E>(
        &self,
        executor: E,
        role_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE roles
            SET permissions = COALESCE(
                (SELECT array_agg(p.slug ORDER BY p.resource, p.action)
                 FROM role_permissions rp
                 JOIN permissions p ON p.id = rp.permission_id
                 WHERE rp.role_id = roles.id AND rp.granted = TRUE),
                '{}'
            ),
            updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(role_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    fn map_role_unique_violation(e: sqlx::Error, name: &str, slug: &str) -> AppError {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return match db_err.constraint() {
                    Some("roles_name_key") => AppError::DuplicateName(name.to_string()),
                    _ => AppError::DuplicateSlug(slug.to_string()),
                };
            }
        }
        e.into()
    }
}
