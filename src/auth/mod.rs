pub mod ownership;
pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Ten years. Longer lifetimes are rejected when the service is built.
pub const MAX_EXPIRY_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: String, email: String, name: String, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let lifetime = Duration::try_hours(expiry_hours.min(MAX_EXPIRY_HOURS) as i64)
            .unwrap_or_else(Duration::zero);
        let exp = (now + lifetime).timestamp();

        Self {
            sub,
            email,
            name,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("JWT expiry must be between 1 and {MAX_EXPIRY_HOURS} hours, got {0}")]
    InvalidExpiry(u64),
}

/// Why a request could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    Missing,
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Issues and verifies HS512 access tokens with a shared secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_hours: u64,
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        if expiry_hours == 0 || expiry_hours > MAX_EXPIRY_HOURS {
            return Err(JwtError::InvalidExpiry(expiry_hours));
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry_hours,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, JwtError> {
        Self::new(&security.jwt_secret, security.jwt_expiry_hours)
    }

    pub fn expiry_hours(&self) -> u64 {
        self.expiry_hours
    }

    /// Sign an access token for the given user identity.
    pub fn issue(&self, sub: String, email: String, name: String) -> Result<String, JwtError> {
        self.sign(&Claims::new(sub, email, name, self.expiry_hours))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Verify a raw token and return its subject.
    pub fn verify_token(&self, token: &str) -> Result<String, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::Invalid(e.to_string()))?;

        let sub = token_data.claims.sub;
        if sub.trim().is_empty() {
            return Err(AuthError::Invalid("token has no subject".to_string()));
        }
        Ok(sub)
    }

    /// Verify an `Authorization` header value (`Bearer <token>`) and return the subject.
    pub fn verify_header(&self, header: Option<&str>) -> Result<String, AuthError> {
        let header = header.ok_or(AuthError::Missing)?;
        let token = bearer_token(header)?;
        self.verify_token(token)
    }
}

/// Second whitespace-separated segment of the header, behind a `Bearer` scheme.
fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let mut segments = header.split_whitespace();
    let scheme = segments.next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Invalid(
            "Authorization header must use Bearer token format".to_string(),
        ));
    }
    segments
        .next()
        .ok_or_else(|| AuthError::Invalid("Empty JWT token".to_string()))
}
