// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// A user row. Accounts are created on first OAuth sign-in by the identity
// collaborator; this backend only reads them and manages `role_id`.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    #[schema(example = "linh@techblog.vn")]
    pub email: String,

    #[schema(example = "Linh Nguyen")]
    pub name: String,

    pub image: Option<String>,

    /// NULL until an administrator assigns a role; a user without a role
    /// fails every permission check.
    pub role_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Claims inside the session JWT issued after the OAuth handshake.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The signed-in user's email.
    pub sub: String,
    pub name: Option<String>,
    pub iat: usize,
    pub exp: usize,
}

// The identity extracted from a valid session token, inserted into request
// extensions by the session middleware.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolePayload {
    /// The role to assign, or null to unassign.
    pub role_id: Option<Uuid>,
}
