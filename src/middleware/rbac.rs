// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{SessionIdentity, User},
};

/// A single required permission, as a type.
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// A set of permissions of which at least one must be granted.
pub trait PermissionSetDef: Send + Sync + 'static {
    fn slugs() -> &'static [&'static str];
}

/// A required permission named by its (resource, action) parts.
pub trait ResourceActionDef: Send + Sync + 'static {
    fn resource() -> &'static str;
    fn action() -> &'static str;
}

// Shared guard preamble. Rejection order is fixed: no session identity is
// always 401; a missing account or missing role is 403.
async fn resolve_caller(parts: &mut Parts, app_state: &AppState) -> Result<User, AppError> {
    let identity = parts
        .extensions
        .get::<SessionIdentity>()
        .ok_or(AppError::Unauthorized)?;

    let user = app_state
        .user_repo
        .find_by_email(&identity.email)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden(format!("No account exists for '{}'.", identity.email))
        })?;

    if user.role_id.is_none() {
        return Err(AppError::Forbidden(
            "Your account has no role assigned.".to_string(),
        ));
    }

    Ok(user)
}

/// Guard: the caller must hold the permission `T::slug()`. On success the
/// resolved user is handed to the handler, saving a second lookup.
pub struct RequirePermission<T: PermissionDef>(pub User, PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let user = resolve_caller(parts, &app_state).await?;

        let required = T::slug();
        if !app_state.access_service.has_permission(user.id, required).await? {
            return Err(AppError::Forbidden(format!(
                "You need the '{}' permission to perform this action.",
                required
            )));
        }

        Ok(RequirePermission(user, PhantomData))
    }
}

/// Guard: the caller must hold at least one of `T::slugs()`.
pub struct RequireAnyPermission<T: PermissionSetDef>(pub User, PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireAnyPermission<T>
where
    T: PermissionSetDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let user = resolve_caller(parts, &app_state).await?;

        let required = T::slugs();
        if !app_state
            .access_service
            .has_any_permission(user.id, required)
            .await?
        {
            return Err(AppError::Forbidden(format!(
                "You need one of the following permissions: {}.",
                required.join(", ")
            )));
        }

        Ok(RequireAnyPermission(user, PhantomData))
    }
}

/// Guard: equivalent to requiring the slug `resource.action`.
pub struct RequireResourcePermission<T: ResourceActionDef>(pub User, PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireResourcePermission<T>
where
    T: ResourceActionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let user = resolve_caller(parts, &app_state).await?;

        if !app_state
            .access_service
            .has_resource_permission(user.id, T::resource(), T::action())
            .await?
        {
            return Err(AppError::Forbidden(format!(
                "You need the '{}.{}' permission to perform this action.",
                T::resource(),
                T::action()
            )));
        }

        Ok(RequireResourcePermission(user, PhantomData))
    }
}

/// Guard for the admin console: the caller's role must carry the admin tag,
/// independent of its granular permission set.
pub struct RequireAdmin(pub User);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let user = resolve_caller(parts, &app_state).await?;

        if !app_state.access_service.is_admin(user.id).await? {
            return Err(AppError::Forbidden(
                "You need administrator access to perform this action.".to_string(),
            ));
        }

        Ok(RequireAdmin(user))
    }
}

// ---
// PERMISSION TYPES USED BY THE ADMIN HANDLERS
// ---

macro_rules! permission_def {
    ($name:ident, $slug:expr) => {
        pub struct $name;
        impl PermissionDef for $name {
            fn slug() -> &'static str {
                $slug
            }
        }
    };
}

permission_def!(PermPermissionsRead, "permissions.read");
permission_def!(PermPermissionsCreate, "permissions.create");
permission_def!(PermPermissionsUpdate, "permissions.update");
permission_def!(PermRolesRead, "roles.read");
permission_def!(PermRolesCreate, "roles.create");
permission_def!(PermRolesUpdate, "roles.update");
permission_def!(PermRolesDelete, "roles.delete");
permission_def!(PermUsersRead, "users.read");
permission_def!(PermUsersManageRoles, "users.manage_roles");

/// Either side of the role editor may inspect a role's grants.
pub struct PermRoleGrantsRead;
impl PermissionSetDef for PermRoleGrantsRead {
    fn slugs() -> &'static [&'static str] {
        &["roles.read", "permissions.read"]
    }
}

pub struct DeletePermissions;
impl ResourceActionDef for DeletePermissions {
    fn resource() -> &'static str {
        "permissions"
    }
    fn action() -> &'static str {
        "delete"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rbac::permission_slug;
    use crate::services::bootstrap::permission_catalog;
    use std::collections::HashSet;

    // A guard referencing a slug the seeder never creates would deny forever.
    #[test]
    fn every_guard_slug_exists_in_the_catalog() {
        let catalog: HashSet<String> = permission_catalog().iter().map(|p| p.slug()).collect();

        let mut required: Vec<String> = vec![
            PermPermissionsRead::slug().into(),
            PermPermissionsCreate::slug().into(),
            PermPermissionsUpdate::slug().into(),
            PermRolesRead::slug().into(),
            PermRolesCreate::slug().into(),
            PermRolesUpdate::slug().into(),
            PermRolesDelete::slug().into(),
            PermUsersRead::slug().into(),
            PermUsersManageRoles::slug().into(),
            permission_slug(DeletePermissions::resource(), DeletePermissions::action()),
        ];
        required.extend(PermRoleGrantsRead::slugs().iter().map(|s| s.to_string()));

        for slug in required {
            assert!(catalog.contains(&slug), "guard slug {slug} not seeded");
        }
    }
}
