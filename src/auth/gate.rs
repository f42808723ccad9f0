use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::provider::{AuthError, AuthProvider, Capability, Credentials, Principal};

/// Outcome of one (caller, capability) check
#[derive(Debug, Clone)]
pub struct AuthorizationDecision {
    pub capability: Capability,
    pub granted: bool,
    /// Set when the provider could not answer; the capability then counts as not granted
    pub failure: Option<AuthError>,
}

impl AuthorizationDecision {
    pub fn is_granted(&self) -> bool {
        self.granted && self.failure.is_none()
    }
}

/// Asks the provider whether a caller holds a capability.
/// Never caches and never mutates anything.
#[derive(Clone)]
pub struct AuthorizationGate {
    provider: Arc<dyn AuthProvider>,
    timeout: Duration,
}

impl AuthorizationGate {
    pub fn new(provider: Arc<dyn AuthProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn check(&self, principal: &Principal, capability: Capability) -> AuthorizationDecision {
        let answer = tokio::time::timeout(
            self.timeout,
            self.provider.is_authorized(principal, &capability),
        )
        .await
        .unwrap_or(Err(AuthError::Timeout));

        match answer {
            Ok(granted) => {
                if !granted {
                    debug!("'{}' lacks capability '{}'", principal.username, capability);
                }
                AuthorizationDecision {
                    capability,
                    granted,
                    failure: None,
                }
            }
            Err(e) => {
                warn!(
                    "Authorization check '{}' for '{}' failed: {}",
                    capability, principal.username, e
                );
                AuthorizationDecision {
                    capability,
                    granted: false,
                    failure: Some(e),
                }
            }
        }
    }

    pub async fn is_authorized(&self, principal: &Principal, capability: Capability) -> bool {
        self.check(principal, capability).await.is_granted()
    }

    /// Credential check, bounded by the same timeout as capability checks
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        tokio::time::timeout(self.timeout, self.provider.authenticate(credentials))
            .await
            .unwrap_or(Err(AuthError::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, ScriptedProvider};

    fn gate(provider: ScriptedProvider) -> AuthorizationGate {
        AuthorizationGate::new(Arc::new(provider), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn granted_and_denied_are_plain_answers() {
        let gate = gate(
            ScriptedProvider::default()
                .with("update", Script::Grant)
                .with("delete", Script::Deny),
        );
        let caller = Principal::new("foo");

        let update = gate.check(&caller, Capability::Update).await;
        assert!(update.is_granted());
        assert!(update.failure.is_none());

        let delete = gate.check(&caller, Capability::Delete).await;
        assert!(!delete.is_granted());
        assert!(delete.failure.is_none());
    }

    #[tokio::test]
    async fn provider_failure_is_not_granted_but_distinguishable() {
        let gate = gate(ScriptedProvider::default().with("create", Script::Fail));
        let decision = gate.check(&Principal::new("foo"), Capability::Create).await;

        assert!(!decision.is_granted());
        assert!(matches!(decision.failure, Some(AuthError::Unavailable(_))));
    }

    #[tokio::test]
    async fn stalled_provider_times_out() {
        let gate = gate(ScriptedProvider::default().with("role:writer", Script::Hang));
        let decision = gate
            .check(&Principal::new("foo"), Capability::role("writer"))
            .await;

        assert!(!decision.is_granted());
        assert!(matches!(decision.failure, Some(AuthError::Timeout)));
    }
}
