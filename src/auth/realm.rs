use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, info};

use super::provider::{AuthError, AuthProvider, Capability, Credentials, Principal};

#[derive(Debug, Error)]
pub enum RealmError {
    #[error("Failed to read user file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid user file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("User '{user}' references undefined role '{role}'")]
    UndefinedRole { user: String, role: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    /// Hex SHA-256 digest of the password
    pub password_sha256: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Users, their roles, and the permissions each role grants.
///
/// File format (YAML):
///
/// ```yaml
/// users:
///   foo:
///     password_sha256: "fcde2b2e..."
///     roles: [editor, writer]
/// roles:
///   editor: [create, delete, update]
///   writer: [update]
///   admin: ["*"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRealm {
    #[serde(default)]
    pub users: HashMap<String, UserEntry>,
    #[serde(default)]
    pub roles: HashMap<String, Vec<String>>,
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare a stored digest with the digest of `password` in constant time
fn digest_matches(stored: &str, password: &str) -> bool {
    let candidate = hash_password(password);
    stored.as_bytes().ct_eq(candidate.as_bytes()).into()
}

impl UserRealm {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RealmError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| RealmError::Io {
            path: shown.clone(),
            source,
        })?;
        let realm = Self::from_yaml(&text).map_err(|source| RealmError::Parse {
            path: shown.clone(),
            source,
        })?;
        realm.validate()?;

        info!("Loaded {} users from {}", realm.users.len(), shown);
        Ok(realm)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Built-in users for local development
    pub fn development() -> Self {
        let mut realm = Self::default();
        realm
            .with_role("admin", &["*"])
            .with_role("editor", &["create", "delete", "update"])
            .with_role("writer", &["update"])
            .with_user("root", "w00t", &["admin"])
            .with_user("foo", "bar", &["editor", "writer"])
            .with_user("bar", "baz", &["writer"])
            .with_user("baz", "baz", &[]);
        realm
    }

    pub fn with_role(&mut self, role: &str, permissions: &[&str]) -> &mut Self {
        self.roles.insert(
            role.to_string(),
            permissions.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn with_user(&mut self, username: &str, password: &str, roles: &[&str]) -> &mut Self {
        self.users.insert(
            username.to_string(),
            UserEntry {
                password_sha256: hash_password(password),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
        self
    }

    fn validate(&self) -> Result<(), RealmError> {
        for (user, entry) in &self.users {
            if let Some(role) = entry.roles.iter().find(|r| !self.roles.contains_key(*r)) {
                return Err(RealmError::UndefinedRole {
                    user: user.clone(),
                    role: role.clone(),
                });
            }
        }
        Ok(())
    }

    fn grants(&self, entry: &UserEntry, capability: &Capability) -> bool {
        match capability {
            Capability::Role(role) => entry.roles.iter().any(|r| r == role),
            other => {
                let wanted = other.to_string();
                entry
                    .roles
                    .iter()
                    .filter_map(|role| self.roles.get(role))
                    .flatten()
                    .any(|permission| permission == "*" || *permission == wanted)
            }
        }
    }
}

#[async_trait]
impl AuthProvider for UserRealm {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        match self.users.get(&credentials.username) {
            Some(entry) if digest_matches(&entry.password_sha256, &credentials.password) => {
                debug!("Authenticated '{}'", credentials.username);
                Ok(Principal::new(credentials.username.clone()))
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn is_authorized(
        &self,
        principal: &Principal,
        capability: &Capability,
    ) -> Result<bool, AuthError> {
        let entry = self
            .users
            .get(&principal.username)
            .ok_or_else(|| AuthError::UnknownPrincipal(principal.username.clone()))?;
        Ok(self.grants(entry, capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn authenticates_known_users_only() {
        let realm = UserRealm::development();

        assert_eq!(realm.authenticate(&creds("foo", "bar")).await.unwrap().username, "foo");
        assert!(matches!(
            realm.authenticate(&creds("foo", "wrong")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            realm.authenticate(&creds("nobody", "bar")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn roles_grant_permissions() {
        let realm = UserRealm::development();
        let foo = Principal::new("foo");
        let bar = Principal::new("bar");
        let root = Principal::new("root");

        assert!(realm.is_authorized(&foo, &Capability::Create).await.unwrap());
        assert!(realm.is_authorized(&foo, &Capability::role("writer")).await.unwrap());
        assert!(realm.is_authorized(&bar, &Capability::Update).await.unwrap());
        assert!(!realm.is_authorized(&bar, &Capability::Delete).await.unwrap());
        assert!(realm.is_authorized(&root, &Capability::Delete).await.unwrap());
        // Wildcard permissions do not imply role membership
        assert!(!realm.is_authorized(&root, &Capability::role("writer")).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_principal_is_a_provider_failure() {
        let realm = UserRealm::development();
        let result = realm
            .is_authorized(&Principal::new("ghost"), &Capability::Update)
            .await;
        assert!(matches!(result, Err(AuthError::UnknownPrincipal(_))));
    }

    #[test]
    fn parses_yaml_realm() {
        let yaml = format!(
            "users:\n  alice:\n    password_sha256: \"{}\"\n    roles: [writer]\nroles:\n  writer: [update]\n",
            hash_password("secret")
        );
        let realm = UserRealm::from_yaml(&yaml).unwrap();
        assert!(realm.validate().is_ok());
        assert_eq!(realm.users["alice"].roles, vec!["writer"]);

        let broken = UserRealm::from_yaml("users:\n  bob:\n    password_sha256: x\n    roles: [ghost]\n").unwrap();
        assert!(matches!(broken.validate(), Err(RealmError::UndefinedRole { .. })));
    }

    #[test]
    fn loads_realm_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.yaml");
        std::fs::write(
            &path,
            format!(
                "users:\n  alice:\n    password_sha256: \"{}\"\n    roles: [writer]\nroles:\n  writer: [update]\n",
                hash_password("secret")
            ),
        )
        .unwrap();

        let realm = UserRealm::from_file(&path).unwrap();
        assert!(realm.users.contains_key("alice"));

        let missing = UserRealm::from_file(dir.path().join("absent.yaml"));
        assert!(matches!(missing, Err(RealmError::Io { .. })));
    }

    #[test]
    fn digest_comparison_rejects_near_misses() {
        let stored = hash_password("bar");
        assert!(digest_matches(&stored, "bar"));
        assert!(!digest_matches(&stored, "baz"));
        assert!(!digest_matches(&stored[..10], "bar"));
        assert!(!digest_matches("", "bar"));
    }

    #[test]
    fn password_digest_is_hex_sha256() {
        assert_eq!(
            hash_password("bar"),
            "fcde2b2edba56bf408601fb721fe9b5c338d10ee429ea04fae5511b68fbf8fb9"
        );
    }
}
