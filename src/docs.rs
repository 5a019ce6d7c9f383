// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- RBAC ---
        handlers::rbac::list_permissions,
        handlers::rbac::create_permission,
        handlers::rbac::update_permission,
        handlers::rbac::delete_permission,
        handlers::rbac::list_roles,
        handlers::rbac::create_role,
        handlers::rbac::update_role,
        handlers::rbac::delete_role,
        handlers::rbac::get_role_permissions,
        handlers::rbac::set_role_permissions,
        handlers::rbac::revoke_role_permission,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::assign_role,
        handlers::users::get_me,
    ),
    components(
        schemas(
            // --- RBAC ---
            models::rbac::Permission,
            models::rbac::Role,
            models::rbac::RolePermission,
            models::rbac::RoleDetail,
            models::rbac::CreatePermissionPayload,
            models::rbac::UpdatePermissionPayload,
            models::rbac::CreateRolePayload,
            models::rbac::UpdateRolePayload,
            models::rbac::SetRolePermissionsPayload,

            // --- Users ---
            models::auth::User,
            models::auth::AssignRolePayload,
        )
    ),
    tags(
        (name = "RBAC", description = "Roles and the permission catalog"),
        (name = "Users", description = "User accounts and role assignment")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "session_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
