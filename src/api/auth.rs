//! Bearer-token auth (§10.1): `/auth/login` issues a JWT signed with the
//! configured secret; `/jobs/*` and `/history` require it via an
//! `axum::extract::FromRequestParts` extractor, mirroring the teacher's
//! `get_current_user` dependency-injection shape.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iss: String,
    exp: i64,
}

pub fn issue_token(username: &str, secret: &str, issuer: &str, ttl_seconds: i64) -> Result<(String, i64), ApiError> {
    let claims = Claims {
        sub: username.to_string(),
        iss: issuer.to_string(),
        exp: (Utc::now().timestamp() + ttl_seconds),
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))?;

    Ok((token, ttl_seconds))
}

fn verify_token(token: &str, secret: &str, issuer: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.set_issuer(&[issuer]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| ApiError::Unauthorized(format!("invalid token: {e}")))?;
    Ok(data.claims)
}

/// Extracted on routes that require auth. Holds the authenticated username.
pub struct AuthUser {
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Authorization header must be a Bearer token".to_string()))?;

        let secret = state
            .config
            .auth
            .jwt_secret
            .as_deref()
            .ok_or_else(|| ApiError::Internal("JWT secret not configured".to_string()))?;

        let claims = verify_token(token, secret, &state.config.auth.jwt_issuer)?;
        Ok(AuthUser { username: claims.sub })
    }
}
