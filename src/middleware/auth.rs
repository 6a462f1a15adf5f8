use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

/// Claims carried by the session token the magic-link provider issues.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

/// The resolved caller: who they are (by email) and whether they are staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub email: String,
    pub role: Role,
}

impl CallerIdentity {
    pub fn customer(email: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_lowercase(),
            role: Role::Customer,
        }
    }

    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_lowercase(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_admin(caller: &CallerIdentity) -> Result<(), AppError> {
    if !caller.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn decode_identity(token: &str, secret: &str) -> Result<CallerIdentity, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let email = decoded.claims.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(CallerIdentity {
        email,
        role: decoded.claims.role,
    })
}

/// Mint a session token. The server only verifies tokens; this exists for
/// tooling and tests.
pub fn issue_token(caller: &CallerIdentity, secret: &str, ttl_secs: i64) -> Result<String, AppError> {
    let exp = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::seconds(ttl_secs))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?
        .timestamp() as usize;
    let claims = Claims {
        sub: caller.email.clone(),
        email: caller.email.clone(),
        role: caller.role,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_str = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthorized)?
            .to_str()
            .map_err(|_| AppError::Unauthorized)?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?
            .trim();

        decode_identity(token, &state.config.jwt_secret)
    }
}
