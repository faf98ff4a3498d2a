use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::access::{Aal, GlobalRole, Identity};
use crate::config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: GlobalRole,
    #[serde(default)]
    pub aal: Aal,
    pub exp: i64,
    pub iat: i64,
}

/// Longest lifetime a minted token may carry
pub const MAX_TOKEN_HOURS: i64 = 24 * 365;

/// Token lifetime in hours, clamped to `1..=MAX_TOKEN_HOURS`
pub fn token_ttl(hours: i64) -> Duration {
    Duration::hours(hours.clamp(1, MAX_TOKEN_HOURS))
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, role: GlobalRole, aal: Aal) -> Self {
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let ttl = token_ttl(i64::try_from(expiry_hours).unwrap_or(MAX_TOKEN_HOURS));
        Self::with_expiry(user_id, email, role, aal, ttl)
    }

    pub fn with_expiry(user_id: Uuid, email: String, role: GlobalRole, aal: Aal, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email,
            role,
            aal,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            global_role: claims.role,
            aal: claims.aal,
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

fn secret() -> Result<&'static str, JwtError> {
    let secret = config::config().security.jwt_secret.as_str();
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    Ok(secret)
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let encoding_key = EncodingKey::from_secret(secret()?.as_bytes());

    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let decoding_key = DecodingKey::from_secret(secret()?.as_bytes());

    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_identity() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "ciso@example.com".to_string(), GlobalRole::Admin, Aal::Aal2);
        let token = generate_jwt(&claims).unwrap();

        let identity: Identity = validate_jwt(&token).unwrap().into();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.global_role, GlobalRole::Admin);
        assert_eq!(identity.aal, Aal::Aal2);
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims::with_expiry(
            Uuid::new_v4(),
            "old@example.com".to_string(),
            GlobalRole::User,
            Aal::Aal1,
            Duration::hours(-2),
        );
        let token = generate_jwt(&claims).unwrap();
        assert!(matches!(validate_jwt(&token), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn token_lifetime_is_clamped() {
        assert_eq!(token_ttl(u64::MAX as i64), Duration::hours(1));
        assert_eq!(token_ttl(i64::MAX), Duration::hours(MAX_TOKEN_HOURS));
        assert_eq!(token_ttl(0), Duration::hours(1));
        assert_eq!(token_ttl(8), Duration::hours(8));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(validate_jwt("not-a-jwt"), Err(JwtError::InvalidToken(_))));
    }
}
