// src/handlers/rbac.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{
        DeletePermissions, PermPermissionsCreate, PermPermissionsRead, PermPermissionsUpdate,
        PermRoleGrantsRead, PermRolesCreate, PermRolesDelete, PermRolesRead, PermRolesUpdate,
        RequireAnyPermission, RequirePermission, RequireResourcePermission,
    },
    models::rbac::{
        CreatePermissionPayload, CreateRolePayload, PermissionFilter, SetRolePermissionsPayload,
        UpdatePermissionPayload, UpdateRolePayload,
    },
};

// ---
// Permission catalog
// ---

// GET /api/admin/permissions
#[utoipa::path(
    get,
    path = "/api/admin/permissions",
    tag = "RBAC",
    params(PermissionFilter),
    responses(
        (status = 200, description = "The permission catalog", body = [crate::models::rbac::Permission])
    ),
    security(("session_jwt" = []))
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPermissionsRead>,
    Query(filter): Query<PermissionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = app_state
        .permission_service
        .list_permissions(filter)
        .await?;

    Ok(Json(permissions))
}

// POST /api/admin/permissions
#[utoipa::path(
    post,
    path = "/api/admin/permissions",
    tag = "RBAC",
    request_body = CreatePermissionPayload,
    responses(
        (status = 201, description = "Permission created", body = crate::models::rbac::Permission),
        (status = 409, description = "A permission with the derived slug already exists")
    ),
    security(("session_jwt" = []))
)]
pub async fn create_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPermissionsCreate>,
    Json(payload): Json<CreatePermissionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let permission = app_state
        .permission_service
        .create_permission(payload)
        .await?;

    Ok((StatusCode::CREATED, Json(permission)))
}

// PUT /api/admin/permissions/{id}
#[utoipa::path(
    put,
    path = "/api/admin/permissions/{id}",
    tag = "RBAC",
    request_body = UpdatePermissionPayload,
    params(("id" = Uuid, Path, description = "Permission id")),
    responses(
        (status = 200, description = "Permission updated", body = crate::models::rbac::Permission),
        (status = 404, description = "No such permission")
    ),
    security(("session_jwt" = []))
)]
pub async fn update_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPermissionsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePermissionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let permission = app_state
        .permission_service
        .update_permission(id, payload)
        .await?;

    Ok(Json(permission))
}

// DELETE /api/admin/permissions/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/permissions/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "Permission id")),
    responses(
        (status = 204, description = "Permission and its role associations deleted"),
        (status = 404, description = "No such permission")
    ),
    security(("session_jwt" = []))
)]
pub async fn delete_permission(
    State(app_state): State<AppState>,
    _guard: RequireResourcePermission<DeletePermissions>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.permission_service.delete_permission(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Roles
// ---

// GET /api/admin/roles
#[utoipa::path(
    get,
    path = "/api/admin/roles",
    tag = "RBAC",
    responses(
        (status = 200, description = "All roles", body = [crate::models::rbac::Role])
    ),
    security(("session_jwt" = []))
)]
pub async fn list_roles(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesRead>,
) -> Result<impl IntoResponse, AppError> {
    let roles = app_state.role_service.list_roles().await?;

    Ok(Json(roles))
}

// POST /api/admin/roles
#[utoipa::path(
    post,
    path = "/api/admin/roles",
    tag = "RBAC",
    request_body = CreateRolePayload,
    responses(
        (status = 201, description = "Role created with an empty permission set", body = crate::models::rbac::Role),
        (status = 409, description = "Name or slug already taken")
    ),
    security(("session_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesCreate>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    let role = app_state.role_service.create_role(payload).await?;

    Ok((StatusCode::CREATED, Json(role)))
}

// PUT /api/admin/roles/{id}
#[utoipa::path(
    put,
    path = "/api/admin/roles/{id}",
    tag = "RBAC",
    request_body = UpdateRolePayload,
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role updated", body = crate::models::rbac::Role),
        (status = 404, description = "No such role")
    ),
    security(("session_jwt" = []))
)]
pub async fn update_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    let role = app_state.role_service.update_role(id, payload).await?;

    Ok(Json(role))
}

// DELETE /api/admin/roles/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role deleted; its users are left without a role"),
        (status = 403, description = "System roles cannot be deleted"),
        (status = 404, description = "No such role")
    ),
    security(("session_jwt" = []))
)]
pub async fn delete_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.role_service.delete_role(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/admin/roles/{id}/permissions
#[utoipa::path(
    get,
    path = "/api/admin/roles/{id}/permissions",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "The role's granted permissions", body = [crate::models::rbac::Permission]),
        (status = 404, description = "No such role")
    ),
    security(("session_jwt" = []))
)]
pub async fn get_role_permissions(
    State(app_state): State<AppState>,
    _guard: RequireAnyPermission<PermRoleGrantsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = app_state.role_service.get_role_permissions(id).await?;

    Ok(Json(permissions))
}

// DELETE /api/admin/roles/{id}/permissions/{permission_id}
#[utoipa::path(
    delete,
    path = "/api/admin/roles/{id}/permissions/{permission_id}",
    tag = "RBAC",
    params(
        ("id" = Uuid, Path, description = "Role id"),
        ("permission_id" = Uuid, Path, description = "Permission id")
    ),
    responses(
        (status = 200, description = "Permission revoked; the association row is kept with granted = false", body = crate::models::rbac::RoleDetail),
        (status = 404, description = "Role or association does not exist")
    ),
    security(("session_jwt" = []))
)]
pub async fn revoke_role_permission(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesUpdate>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .role_service
        .revoke_role_permission(id, permission_id)
        .await?;

    Ok(Json(detail))
}

// PUT /api/admin/roles/{id}/permissions
#[utoipa::path(
    put,
    path = "/api/admin/roles/{id}/permissions",
    tag = "RBAC",
    request_body = SetRolePermissionsPayload,
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Permission set replaced", body = crate::models::rbac::RoleDetail),
        (status = 404, description = "Role or one of the permissions does not exist")
    ),
    security(("session_jwt" = []))
)]
pub async fn set_role_permissions(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRolesUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRolePermissionsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .role_service
        .set_role_permissions(id, payload.permission_ids)
        .await?;

    Ok(Json(detail))
}
