// src/handlers/users.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermUsersManageRoles, PermUsersRead, RequireAdmin, RequirePermission},
    models::auth::AssignRolePayload,
};

// GET /api/admin/users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Users",
    responses(
        (status = 200, description = "All registered users", body = [crate::models::auth::User])
    ),
    security(("session_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUsersRead>,
) -> Result<impl IntoResponse, AppError> {
    let users = app_state.user_repo.list_all().await?;

    Ok(Json(users))
}

// PUT /api/admin/users/{id}/role
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    tag = "Users",
    request_body = AssignRolePayload,
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Role assigned (or unassigned when roleId is null)", body = crate::models::auth::User),
        (status = 404, description = "User or role does not exist")
    ),
    security(("session_jwt" = []))
)]
pub async fn assign_role(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermUsersManageRoles>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRolePayload>,
) -> Result<impl IntoResponse, AppError> {
    let user = app_state
        .role_service
        .assign_user_role(id, payload.role_id)
        .await?;

    Ok(Json(user))
}

// GET /api/admin/me — the admin-console entry gate. Succeeds for any active
// role tagged as an admin role, regardless of its granular grants.
#[utoipa::path(
    get,
    path = "/api/admin/me",
    tag = "Users",
    responses(
        (status = 200, description = "The calling administrator", body = crate::models::auth::User),
        (status = 403, description = "The caller's role is not an admin role")
    ),
    security(("session_jwt" = []))
)]
pub async fn get_me(RequireAdmin(user): RequireAdmin) -> Result<impl IntoResponse, AppError> {
    Ok(Json(user))
}
