pub mod gate;
pub mod provider;
pub mod realm;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

pub use gate::{AuthorizationDecision, AuthorizationGate};
pub use provider::{AuthError, AuthProvider, Capability, Credentials, Principal};
pub use realm::{hash_password, RealmError, UserRealm};

/// Claims carried by API and session tokens.
///
/// The `can*` flags describe the caller at issue time for clients; every
/// mutation is still authorized against the provider when it happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "canCreate")]
    pub can_create: bool,
    #[serde(rename = "canUpdate")]
    pub can_update: bool,
    #[serde(rename = "canDelete")]
    pub can_delete: bool,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Principal::new(claims.sub)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    Generation(String),

    #[error("Invalid JWT token: {0}")]
    Invalid(String),
}

/// Signs and verifies HS256 tokens for one issuer
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    issuer: String,
    expiry_hours: u64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            expiry_hours,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.jwt_secret, &config.jwt_issuer, config.jwt_expiry_hours)
    }

    pub fn claims_for(&self, principal: &Principal, can_create: bool, can_update: bool, can_delete: bool) -> Claims {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.expiry_hours as i64)).timestamp();

        Claims {
            sub: principal.username.clone(),
            can_create,
            can_update,
            can_delete,
            iss: self.issuer.clone(),
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn generate(&self, claims: &Claims) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), claims, &encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::default();
        validation.set_issuer(&[self.issuer.as_str()]);

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        Ok(token_data.claims)
    }
}
