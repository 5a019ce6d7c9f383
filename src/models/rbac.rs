// src/models/rbac.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Derives the canonical permission slug from its parts.
pub fn permission_slug(resource: &str, action: &str) -> String {
    format!("{}.{}", resource, action)
}

// Distinguishes an absent update field (keep the current value) from an
// explicit null (clear the value).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// Slug parts are lowercase identifiers; a '.' inside either part would make
// the derived slug ambiguous.
pub fn validate_slug_part(value: &str) -> Result<(), ValidationError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !ok {
        let mut err = ValidationError::new("slug_part");
        err.message = Some("Only lowercase letters, digits and '_' are allowed.".into());
        return Err(err);
    }
    Ok(())
}

// Rows of the `permissions` table.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440001")]
    pub id: Uuid,

    #[schema(example = "Publish posts")]
    pub name: String,

    #[schema(example = "posts.publish")]
    pub slug: String,

    #[schema(example = "Move a draft post to the published state")]
    pub description: Option<String>,

    #[schema(example = "posts")]
    pub resource: String,

    #[schema(example = "publish")]
    pub action: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Rows of the `roles` table. `permissions` is the denormalized slug array
// recomputed from `role_permissions` on every write through the role service.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "Editor")]
    pub name: String,

    #[schema(example = "editor")]
    pub slug: String,

    #[schema(example = "Full read-write access to posts, comments and tags")]
    pub description: Option<String>,

    #[schema(example = json!(["posts.read", "posts.update"]))]
    pub permissions: Vec<String>,

    pub is_active: bool,
    pub is_system: bool,
    pub is_admin_role: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Rows of the `role_permissions` join table. `granted = false` records an
// explicit revocation rather than deleting the row.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub granted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionPayload {
    #[validate(length(min = 1, message = "The name is required."))]
    #[schema(example = "Publish posts")]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_slug_part"))]
    #[schema(example = "posts")]
    pub resource: String,

    #[validate(custom(function = "validate_slug_part"))]
    #[schema(example = "publish")]
    pub action: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissionPayload {
    #[validate(length(min = 1, message = "The name cannot be empty."))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    #[validate(custom(function = "validate_slug_part"))]
    pub resource: Option<String>,

    #[validate(custom(function = "validate_slug_part"))]
    pub action: Option<String>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PermissionFilter {
    /// Only permissions with this activity flag.
    pub is_active: Option<bool>,
    /// Only permissions for this resource.
    pub resource: Option<String>,
    /// Free-text match over name, slug, resource and action.
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[validate(length(min = 1, message = "The name is required."))]
    #[schema(example = "Editor")]
    pub name: String,

    #[validate(custom(function = "validate_slug_part"))]
    #[schema(example = "editor")]
    pub slug: String,

    pub description: Option<String>,
}

// `is_system` and `is_admin_role` are deliberately absent: both are fixed at
// creation time and must not change through the update API.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolePayload {
    #[validate(length(min = 1, message = "The name cannot be empty."))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_slug_part"))]
    pub slug: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetRolePermissionsPayload {
    #[schema(example = json!(["550e8400-e29b-41d4-a716-446655440001"]))]
    pub permission_ids: Vec<Uuid>,
}

// Role plus its resolved granted permissions, for the admin role editor.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: Role,

    pub granted: Vec<Permission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_resource_dot_action() {
        assert_eq!(permission_slug("posts", "publish"), "posts.publish");
        assert_eq!(permission_slug("users", "manage_roles"), "users.manage_roles");
    }

    #[test]
    fn update_payload_distinguishes_absent_from_null_description() {
        let absent: UpdatePermissionPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.description, None);

        let cleared: UpdatePermissionPayload =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: UpdateRolePayload =
            serde_json::from_str(r#"{"description": "content desk"}"#).unwrap();
        assert_eq!(set.description, Some(Some("content desk".into())));
    }

    #[test]
    fn slug_parts_reject_separators_and_empty() {
        assert!(validate_slug_part("posts").is_ok());
        assert!(validate_slug_part("manage_roles").is_ok());
        assert!(validate_slug_part("").is_err());
        assert!(validate_slug_part("posts.publish").is_err());
        assert!(validate_slug_part("Posts").is_err());
        assert!(validate_slug_part("po sts").is_err());
    }
}
