//! Route guard for protected page trees

use std::sync::Arc;

use tokio::sync::watch;

use super::context::{AuthContext, AuthState};
use super::navigator::Navigator;

/// Rendering decision for a protected subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Verification still in flight; render a loading placeholder
    Loading,
    /// Session authenticated; render the protected subtree
    Allow,
    /// No session; the guard has navigated to the login entry point
    RedirectToLogin,
}

/// Gates a protected route subtree on the observed auth state
pub struct RouteGuard {
    state_rx: watch::Receiver<AuthState>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl RouteGuard {
    pub fn new(context: &AuthContext) -> Self {
        Self {
            state_rx: context.subscribe(),
            navigator: context.navigator(),
            login_path: context.login_path(),
        }
    }

    /// Synchronous decision from the current state. Never navigates.
    pub fn decide(&self) -> GuardDecision {
        match &*self.state_rx.borrow() {
            AuthState::Unknown => GuardDecision::Loading,
            AuthState::Authenticated(_) => GuardDecision::Allow,
            AuthState::Unauthenticated => GuardDecision::RedirectToLogin,
        }
    }

    /// Wait for the state to settle, then either allow or redirect to the
    /// login entry point. The attempted destination is discarded.
    pub async fn resolve(&mut self) -> GuardDecision {
        let settled = self
            .state_rx
            .wait_for(|state| !matches!(state, AuthState::Unknown))
            .await;

        let allow = match settled {
            Ok(state) => state.is_authenticated(),
            // Context dropped mid-flight: fail closed
            Err(_) => false,
        };

        if allow {
            GuardDecision::Allow
        } else {
            tracing::debug!("Unauthenticated, redirecting to login");
            self.navigator.navigate(&self.login_path);
            GuardDecision::RedirectToLogin
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::super::credentials::{CredentialScope, CredentialStore};
    use super::super::navigator::testing::RecordingNavigator;
    use super::super::role::Role;
    use super::super::router::RoleRouter;
    use crate::api::ApiClient;
    use crate::core::config::{ApiConfig, OriginConfig, SessionConfig};

    fn context_for(server: &MockServer) -> (AuthContext, Arc<RecordingNavigator>, CredentialStore) {
        let navigator = Arc::new(RecordingNavigator::default());
        let credentials = CredentialStore::in_memory();
        let api = Arc::new(
            ApiClient::new(&ApiConfig {
                base_url: server.base_url(),
                timeout_secs: 5,
            })
            .unwrap(),
        );
        let router = RoleRouter::new(
            OriginConfig::default().destinations().unwrap(),
            credentials.clone(),
            navigator.clone(),
        );
        let session = SessionConfig {
            scope: Some(Role::Staff),
            ..Default::default()
        };
        let context = AuthContext::new(session, credentials.clone(), api, router, navigator.clone());
        (context, navigator, credentials)
    }

    #[tokio::test]
    async fn test_unknown_state_is_loading() {
        let server = MockServer::start_async().await;
        let (context, navigator, _credentials) = context_for(&server);
        let guard = RouteGuard::new(&context);
        assert_eq!(guard.decide(), GuardDecision::Loading);
        assert!(navigator.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_allows_authenticated_session() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/me");
                then.status(200).json_body(json!({
                    "status": "SUCCESS",
                    "data": { "id": 1, "role": { "name": "staff" } }
                }));
            })
            .await;

        let (context, navigator, credentials) = context_for(&server);
        credentials
            .set(
                CredentialScope::Role(Role::Staff),
                "tok-1",
                Some(Role::Staff),
                None,
                chrono::Duration::days(7),
            )
            .await
            .unwrap();

        let mut guard = RouteGuard::new(&context);
        let (decision, _) = tokio::join!(guard.resolve(), context.check_session());
        assert_eq!(decision, GuardDecision::Allow);
        assert_eq!(guard.decide(), GuardDecision::Allow);
        assert!(navigator.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_redirects_unauthenticated_session() {
        let server = MockServer::start_async().await;
        let (context, navigator, _credentials) = context_for(&server);

        let mut guard = RouteGuard::new(&context);
        // No stored credential: bootstrap settles to Unauthenticated offline
        let (decision, _) = tokio::join!(guard.resolve(), context.check_session());
        assert_eq!(decision, GuardDecision::RedirectToLogin);
        assert_eq!(navigator.navigations(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_fails_closed_when_context_dropped() {
        let server = MockServer::start_async().await;
        let (context, navigator, _credentials) = context_for(&server);
        let mut guard = RouteGuard::new(&context);
        drop(context);

        assert_eq!(guard.resolve().await, GuardDecision::RedirectToLogin);
        assert_eq!(navigator.navigations().len(), 1);
    }
}
