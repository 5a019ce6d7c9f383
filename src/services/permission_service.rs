// src/services/permission_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::db::RbacRepository;
use crate::models::rbac::{
    CreatePermissionPayload, Permission, PermissionFilter, UpdatePermissionPayload,
    permission_slug,
};

#[derive(Clone)]
pub struct PermissionService {
    repo: RbacRepository,
    pool: PgPool,
}

impl PermissionService {
    pub fn new(repo: RbacRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn create_permission(
        &self,
        payload: CreatePermissionPayload,
    ) -> Result<Permission, AppError> {
        payload.validate()?;

        // The slug is always derived, never supplied by the caller.
        let slug = permission_slug(&payload.resource, &payload.action);

        self.repo
            .insert_permission(
                &self.pool,
                &payload.name,
                &slug,
                payload.description.as_deref(),
                &payload.resource,
                &payload.action,
            )
            .await
    }

    pub async fn list_permissions(
        &self,
        filter: PermissionFilter,
    ) -> Result<Vec<Permission>, AppError> {
        self.repo
            .list_permissions(
                filter.is_active,
                filter.resource.as_deref(),
                filter.search.as_deref(),
            )
            .await
    }

    pub async fn update_permission(
        &self,
        id: Uuid,
        payload: UpdatePermissionPayload,
    ) -> Result<Permission, AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;

        let current = self
            .repo
            .find_permission_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Permission"))?;

        let name = payload.name.unwrap_or(current.name);
        // Absent keeps the current description; an explicit null clears it.
        let description = payload.description.unwrap_or(current.description);
        let resource = payload.resource.unwrap_or(current.resource);
        let action = payload.action.unwrap_or(current.action);
        let is_active = payload.is_active.unwrap_or(current.is_active);

        // Editing resource/action regenerates the slug.
        let slug = permission_slug(&resource, &action);
        let slug_changed = slug != current.slug;

        let updated = self
            .repo
            .update_permission(
                &mut *tx,
                id,
                &name,
                &slug,
                description.as_deref(),
                &resource,
                &action,
                is_active,
            )
            .await?;

        // A renamed slug invalidates the denormalized arrays of every role
        // holding this permission.
        if slug_changed {
            let role_ids = self.repo.role_ids_referencing(&mut *tx, id).await?;
            for role_id in role_ids {
                self.repo.refresh_role_slugs(&mut *tx, role_id).await?;
            }
        }

        tx.commit().await?;

        Ok(updated)
    }

    // Cascade: associations first, then the affected roles' slug arrays, then
    // the permission itself, all in one transaction. Roles left without any
    // permission simply end up with an empty grant set.
    pub async fn delete_permission(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo
            .find_permission_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Permission"))?;

        let role_ids = self.repo.role_ids_referencing(&mut *tx, id).await?;

        self.repo.delete_permission_links(&mut *tx, id).await?;

        for role_id in role_ids {
            self.repo.refresh_role_slugs(&mut *tx, role_id).await?;
        }

        self.repo.delete_permission(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!(permission_id = %id, "permission deleted with cascading associations");

        Ok(())
    }
}
