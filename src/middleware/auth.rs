// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{SessionClaims, SessionIdentity},
};

// Validates the session token minted after the external OAuth handshake and
// stashes the identity in the request extensions. Guards downstream turn a
// missing identity into 401; everything here is identity only, no user row
// lookup yet.
pub async fn session_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(AppError::Unauthorized);
    };

    let identity = decode_session(bearer.token(), &app_state.jwt_secret)?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

pub fn decode_session(token: &str, secret: &str) -> Result<SessionIdentity, AppError> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(SessionIdentity {
        email: token_data.claims.sub,
        name: token_data.claims.name,
    })
}

// Extractor for handlers that only need the session identity.
impl<S> FromRequestParts<S> for SessionIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionIdentity>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, email: &str) -> String {
        let now = Utc::now().timestamp() as usize;
        let claims = SessionClaims {
            sub: email.to_string(),
            name: Some("Linh Nguyen".into()),
            iat: now,
            exp: now + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_the_identity() {
        let identity = decode_session(&token("secret", "linh@techblog.vn"), "secret").unwrap();
        assert_eq!(identity.email, "linh@techblog.vn");
        assert_eq!(identity.name.as_deref(), Some("Linh Nguyen"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        assert!(decode_session(&token("secret", "a@b.c"), "other").is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(decode_session("not-a-jwt", "secret").is_err());
    }
}
