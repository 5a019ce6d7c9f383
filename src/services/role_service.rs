// src/services/role_service.rs

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::db::{RbacRepository, UserRepository};
use crate::models::auth::User;
use crate::models::rbac::{CreateRolePayload, Permission, Role, RoleDetail, UpdateRolePayload};

#[derive(Clone)]
pub struct RoleService {
    repo: RbacRepository,
    user_repo: UserRepository,
    pool: PgPool,
}

impl RoleService {
    pub fn new(repo: RbacRepository, user_repo: UserRepository, pool: PgPool) -> Self {
        Self {
            repo,
            user_repo,
            pool,
        }
    }

    // Roles created through the API are never system or admin roles; those
    // flags exist only on the seeded ladder.
    pub async fn create_role(&self, payload: CreateRolePayload) -> Result<Role, AppError> {
        payload.validate()?;

        self.repo
            .insert_role(
                &self.pool,
                &payload.name,
                &payload.slug,
                payload.description.as_deref(),
                false,
                false,
            )
            .await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        self.repo.list_roles().await
    }

    pub async fn update_role(&self, id: Uuid, payload: UpdateRolePayload) -> Result<Role, AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;

        let current = self
            .repo
            .find_role_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Role"))?;

        let name = payload.name.unwrap_or(current.name);
        let slug = payload.slug.unwrap_or(current.slug);
        // Absent keeps the current description; an explicit null clears it.
        let description = payload.description.unwrap_or(current.description);
        let is_active = payload.is_active.unwrap_or(current.is_active);

        let updated = self
            .repo
            .update_role(&mut *tx, id, &name, &slug, description.as_deref(), is_active)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    // Cascade in one transaction: users lose the role reference, associations
    // go, then the role row.
    pub async fn delete_role(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let role = self
            .repo
            .find_role_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Role"))?;

        if role.is_system {
            return Err(AppError::ProtectedResource(role.name));
        }

        let detached = self.repo.detach_role_from_users(&mut *tx, id).await?;
        self.repo.delete_role_links(&mut *tx, id).await?;
        self.repo.delete_role(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!(role = %role.name, detached_users = detached, "role deleted");

        Ok(())
    }

    /// The canonical bulk assignment: replaces the association set with
    /// exactly the given permissions granted, and refreshes the denormalized
    /// slug array, in one transaction. Callers mutating grants any other way
    /// would reintroduce the representation drift this funnel exists to stop.
    pub async fn set_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> Result<RoleDetail, AppError> {
        let unique_ids: HashSet<Uuid> = permission_ids.into_iter().collect();
        let ids: Vec<Uuid> = unique_ids.into_iter().collect();

        let mut tx = self.pool.begin().await?;

        // Row lock: concurrent replaces of the same role serialize here, so
        // the later committer fully overwrites the earlier one.
        self.repo
            .find_role_by_id_for_update(&mut *tx, role_id)
            .await?
            .ok_or(AppError::NotFound("Role"))?;

        let permissions = self.repo.find_permissions_by_ids(&mut *tx, &ids).await?;
        if permissions.len() != ids.len() {
            return Err(AppError::NotFound("Permission"));
        }

        // Delete-then-insert inside the transaction, so a concurrent reader
        // never observes the role with zero permissions mid-replace.
        self.repo.delete_role_links(&mut *tx, role_id).await?;
        if !ids.is_empty() {
            self.repo.grant_permissions(&mut *tx, role_id, &ids).await?;
        }
        self.repo.refresh_role_slugs(&mut *tx, role_id).await?;

        let role = self
            .repo
            .find_role_by_id(&mut *tx, role_id)
            .await?
            .ok_or(AppError::NotFound("Role"))?;
        let granted = self.repo.granted_permissions(&mut *tx, role_id).await?;

        tx.commit().await?;

        Ok(RoleDetail { role, granted })
    }

    /// Soft revocation: the association row stays, flipped to
    /// `granted = false`, so the grant history remains auditable.
    pub async fn revoke_role_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<RoleDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        // Same per-role lock as set_role_permissions.
        self.repo
            .find_role_by_id_for_update(&mut *tx, role_id)
            .await?
            .ok_or(AppError::NotFound("Role"))?;

        let revoked = self
            .repo
            .revoke_permission(&mut *tx, role_id, permission_id)
            .await?;
        if revoked == 0 {
            return Err(AppError::NotFound("Permission"));
        }

        self.repo.refresh_role_slugs(&mut *tx, role_id).await?;

        let role = self
            .repo
            .find_role_by_id(&mut *tx, role_id)
            .await?
            .ok_or(AppError::NotFound("Role"))?;
        let granted = self.repo.granted_permissions(&mut *tx, role_id).await?;

        tx.commit().await?;

        Ok(RoleDetail { role, granted })
    }

    pub async fn get_role_permissions(&self, role_id: Uuid) -> Result<Vec<Permission>, AppError> {
        self.repo
            .find_role_by_id(&self.pool, role_id)
            .await?
            .ok_or(AppError::NotFound("Role"))?;

        self.repo.granted_permissions(&self.pool, role_id).await
    }

    pub async fn assign_user_role(
        &self,
        user_id: Uuid,
        role_id: Option<Uuid>,
    ) -> Result<User, AppError> {
        if let Some(role_id) = role_id {
            self.repo
                .find_role_by_id(&self.pool, role_id)
                .await?
                .ok_or(AppError::NotFound("Role"))?;
        }

        self.user_repo
            .assign_role(&self.pool, user_id, role_id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }
}

#[cfg(test)]
mod pg_tests {
    use super::*;
    use crate::models::rbac::CreateRolePayload;

    async fn connect() -> sqlx::PgPool {
        let url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
        let pool = sqlx::PgPool::connect(&url).await.unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        pool
    }

    fn service(pool: sqlx::PgPool) -> RoleService {
        RoleService::new(
            RbacRepository::new(pool.clone()),
            UserRepository::new(pool.clone()),
            pool,
        )
    }

    // Two concurrent bulk replaces with disjoint sets must leave exactly one
    // of the two sets behind, never a union. Without the per-role row lock,
    // READ COMMITTED lets the loser's delete miss the winner's freshly
    // committed rows, merging the sets.
    #[tokio::test]
    #[ignore = "requires a live Postgres at DATABASE_URL"]
    async fn concurrent_replaces_end_in_exactly_one_set() {
        let pool = connect().await;
        let svc = service(pool.clone());
        let repo = RbacRepository::new(pool.clone());

        let tag = Uuid::new_v4().simple().to_string();
        let role = svc
            .create_role(CreateRolePayload {
                name: format!("race {tag}"),
                slug: format!("race_{tag}"),
                description: None,
            })
            .await
            .unwrap();

        let resource = format!("race_{tag}");
        let p1 = repo
            .insert_permission(&pool, "Race A", &format!("{resource}.a"), None, &resource, "a")
            .await
            .unwrap();
        let p2 = repo
            .insert_permission(&pool, "Race B", &format!("{resource}.b"), None, &resource, "b")
            .await
            .unwrap();

        for _ in 0..20 {
            let (a, b) = tokio::join!(
                svc.set_role_permissions(role.id, vec![p1.id]),
                svc.set_role_permissions(role.id, vec![p2.id]),
            );
            a.unwrap();
            b.unwrap();

            let granted = svc.get_role_permissions(role.id).await.unwrap();
            let ids: Vec<Uuid> = granted.iter().map(|p| p.id).collect();
            assert!(
                ids == vec![p1.id] || ids == vec![p2.id],
                "merged or empty set after concurrent replace: {ids:?}"
            );

            // The denormalized slug array must match the surviving set.
            let fresh = repo.find_role_by_id(&pool, role.id).await.unwrap().unwrap();
            let slugs: Vec<String> = granted.into_iter().map(|p| p.slug).collect();
            assert_eq!(fresh.permissions, slugs);
        }

        svc.delete_role(role.id).await.unwrap();
        repo.delete_permission(&pool, p1.id).await.unwrap();
        repo.delete_permission(&pool, p2.id).await.unwrap();
    }
}
