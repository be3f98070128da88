use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
};

/// Role every mutating endpoint requires.
pub const ADMIN_ROLE: &str = "admin";

/// Header accepted instead of a token when running locally.
pub const LOCAL_BYPASS_HEADER: &str = "x-admin-user";

/// Claims
///
/// Payload of an admin session token (HS256).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Admin account name.
    pub sub: String,
    pub role: String,
    pub iat: usize,
    pub exp: usize,
}

/// AdminUser
///
/// Resolved identity of an authenticated admin request.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub subject: String,
    pub role: String,
}

/// issue_token
///
/// Signs a token for `subject` valid for `ttl_secs`. Used by operators and tests
/// to obtain a session for the admin panel.
pub fn issue_token(
    secret: &str,
    subject: &str,
    role: &str,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_string(),
        iat: now.max(0) as usize,
        exp: (now + ttl_secs).max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// AdminUser extractor
///
/// 1. Local bypass: in `Env::Local` an `x-admin-user` header is enough.
/// 2. Otherwise a `Bearer` token signed with the configured secret is required.
/// 3. The token's role must be `admin`.
///
/// Rejects with 401 for missing/invalid tokens and 403 for other roles.
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(name) = parts
                .headers
                .get(LOCAL_BYPASS_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|name| !name.is_empty())
            {
                tracing::debug!(admin = name, "local admin bypass used");
                return Ok(AdminUser {
                    subject: name.to_string(),
                    role: ADMIN_ROLE.to_string(),
                });
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::Unauthorized("token expired".to_string()),
            _ => ApiError::Unauthorized("invalid token".to_string()),
        })?;

        let claims = token_data.claims;
        if claims.role != ADMIN_ROLE {
            tracing::warn!(subject = %claims.sub, role = %claims.role, "non-admin token rejected");
            return Err(ApiError::Forbidden("admin role required".to_string()));
        }

        Ok(AdminUser {
            subject: claims.sub,
            role: claims.role,
        })
    }
}
