use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Single error type for the whole request pipeline. Services return the
// data-integrity variants; only the guards produce Unauthorized/Forbidden.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("A permission with slug '{0}' already exists")]
    DuplicateSlug(String),

    #[error("A role named '{0}' already exists")]
    DuplicateName(String),

    #[error("'{0}' is a system role and cannot be deleted")]
    ProtectedResource(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid or expired session token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Return every field-level validation message.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::DuplicateSlug(_) | AppError::DuplicateName(_) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::ProtectedResource(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            AppError::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired session token.".to_string(),
            ),

            // Storage and internal errors are logged with full detail and
            // surfaced as a generic failure instead of crashing the pipeline.
            ref e => {
                tracing::error!("internal server error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_maps_to_401() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn permission_denial_maps_to_403() {
        let response =
            AppError::Forbidden("You need the 'posts.publish' permission.".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn duplicate_slug_maps_to_409() {
        let response = AppError::DuplicateSlug("posts.create".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_entity_maps_to_404() {
        let response = AppError::NotFound("Role").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn system_role_protection_maps_to_403() {
        let response = AppError::ProtectedResource("Super Admin".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
