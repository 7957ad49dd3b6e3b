pub mod password;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub token_type: TokenKind,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn new(user_id: i64, token_type: TokenKind, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            token_type,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("Token expired")]
    Expired,

    #[error("Malformed or tampered token: {0}")]
    Invalid(String),

    #[error("Expected {expected:?} token, got {actual:?}")]
    WrongType { expected: TokenKind, actual: TokenKind },
}

/// Issues and verifies the signed access/refresh token pair
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenService {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            secret: security.jwt_secret.clone(),
            access_lifetime: Duration::minutes(security.access_token_minutes),
            refresh_lifetime: Duration::hours(security.refresh_token_hours),
        }
    }

    /// Fresh refresh token plus an access token for the same user
    pub fn issue_pair(&self, user_id: i64) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            refresh: self.issue(user_id, TokenKind::Refresh)?,
            access: self.issue(user_id, TokenKind::Access)?,
        })
    }

    pub fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String, JwtError> {
        let lifetime = match kind {
            TokenKind::Access => self.access_lifetime,
            TokenKind::Refresh => self.refresh_lifetime,
        };
        let claims = Claims::new(user_id, kind, lifetime);

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.key()?))
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Verify signature, expiry and token type
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &DecodingKey::from_secret(self.key()?), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })?;

        if claims.token_type != expected {
            return Err(JwtError::WrongType {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }

    fn key(&self) -> Result<&[u8], JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        Ok(self.secret.as_bytes())
    }
}
