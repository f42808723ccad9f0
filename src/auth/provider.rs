use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named permission checked before a mutation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    Create,
    Update,
    Delete,
    /// Role membership, written `role:<name>`
    Role(String),
}

impl Capability {
    pub fn role(name: impl Into<String>) -> Self {
        Capability::Role(name.into())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Create => write!(f, "create"),
            Capability::Update => write!(f, "update"),
            Capability::Delete => write!(f, "delete"),
            Capability::Role(role) => write!(f, "role:{}", role),
        }
    }
}

impl std::str::FromStr for Capability {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Capability::Create),
            "update" => Ok(Capability::Update),
            "delete" => Ok(Capability::Delete),
            other => match other.strip_prefix("role:") {
                Some(role) if !role.is_empty() => Ok(Capability::role(role)),
                _ => Err(AuthError::UnknownCapability(other.to_string())),
            },
        }
    }
}

/// The authenticated caller of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Failures of the authorization provider itself, as opposed to a denial
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Unknown principal: {0}")]
    UnknownPrincipal(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Authorization provider timed out")]
    Timeout,

    #[error("Authorization provider unavailable: {0}")]
    Unavailable(String),
}

/// External source of identities and permissions
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError>;

    async fn is_authorized(
        &self,
        principal: &Principal,
        capability: &Capability,
    ) -> Result<bool, AuthError>;
}
