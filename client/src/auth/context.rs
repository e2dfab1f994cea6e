//! Authentication state machine
//!
//! `AuthContext` is the single owner of `AuthState`. Bootstrap, login,
//! logout, idle expiry, and handoff adoption all run through it; consumers
//! observe state through a watch channel and never see verification errors
//! directly.

use std::sync::{Arc, Weak};

use reqwest::Url;
use thiserror::Error;
use tokio::sync::{Mutex, watch};

use super::credentials::{CredentialScope, CredentialStore};
use super::idle::{ActivityHandle, IdleMonitor, Interaction};
use super::navigator::Navigator;
use super::role::Role;
use super::router::{RoleRouter, consume_handoff_token};
use super::verifier::{AuthenticatedUser, SessionVerifier, VerifyError};
use crate::api::ApiClient;
use crate::core::config::SessionConfig;
use crate::core::constants::{MSG_INVALID_ROLE, MSG_LOGIN_FAILED, MSG_SERVER_UNREACHABLE};

/// Authentication state of this process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Verification in flight; no navigation decision yet
    #[default]
    Unknown,
    Authenticated(AuthenticatedUser),
    Unauthenticated,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Login failure surfaced inline to the login form.
///
/// `Display` is the user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    /// Backend rejected the credentials; carries the backend's message
    #[error("{0}")]
    Rejected(String),
    /// Backend unreachable
    #[error("{}", MSG_SERVER_UNREACHABLE)]
    Unreachable,
    /// Role outside the known set; credentials already cleared
    #[error("{}", MSG_INVALID_ROLE)]
    InvalidRole,
}

impl From<super::router::RouteError> for LoginError {
    fn from(_: super::router::RouteError) -> Self {
        LoginError::InvalidRole
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignOutReason {
    UserRequested,
    IdleTimeout,
    VerificationFailed,
}

struct AuthInner {
    session: SessionConfig,
    credentials: CredentialStore,
    verifier: SessionVerifier,
    api: Arc<ApiClient>,
    router: RoleRouter,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<AuthState>,
    /// Held for the duration of a bootstrap check
    bootstrap_lock: Mutex<()>,
    idle: parking_lot::Mutex<IdleMonitor>,
}

/// The single source of truth for `AuthState`
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<AuthInner>,
}

impl AuthContext {
    /// Wire the context. Called once per process, from the composition root.
    pub fn new(
        session: SessionConfig,
        credentials: CredentialStore,
        api: Arc<ApiClient>,
        router: RoleRouter,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        let idle_timeout = session.idle_timeout();
        Self {
            inner: Arc::new(AuthInner {
                session,
                credentials,
                verifier: SessionVerifier::new(api.clone()),
                api,
                router,
                navigator,
                state,
                bootstrap_lock: Mutex::new(()),
                idle: parking_lot::Mutex::new(IdleMonitor::new(idle_timeout)),
            }),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state transitions
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// The authenticated user, when present
    pub fn user(&self) -> Option<AuthenticatedUser> {
        self.state().user().cloned()
    }

    pub(crate) fn navigator(&self) -> Arc<dyn Navigator> {
        self.inner.navigator.clone()
    }

    pub(crate) fn login_path(&self) -> String {
        self.inner.session.login_path.clone()
    }

    /// Report a user interaction to the idle monitor.
    pub fn record_interaction(&self, interaction: Interaction) {
        let handle = self.inner.idle.lock().activity_handle();
        if let Some(handle) = handle {
            handle.record(interaction);
        }
    }

    /// Cloneable activity handle, present while a session is authenticated
    pub fn activity_handle(&self) -> Option<ActivityHandle> {
        self.inner.idle.lock().activity_handle()
    }

    /// Adopt a one-shot handoff token from the current URL into the shared
    /// scope, stripping it from the address. Returns whether a token was
    /// adopted.
    pub async fn adopt_handoff(&self, current_url: &Url) -> bool {
        let Some(token) = consume_handoff_token(self.inner.navigator.as_ref(), current_url)
        else {
            return false;
        };
        if let Err(e) = self
            .inner
            .credentials
            .set(
                CredentialScope::Shared,
                token,
                None,
                None,
                self.inner.session.ttl(),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to persist handoff credential");
        }
        true
    }

    /// Bootstrap: read the stored credential, verify it, settle the state.
    ///
    /// Re-entrant: a caller that finds a check already in flight waits for it
    /// and returns the settled state instead of starting a second one.
    pub async fn check_session(&self) -> AuthState {
        let _guard = match self.inner.bootstrap_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let _settled = self.inner.bootstrap_lock.lock().await;
                return self.state();
            }
        };

        let token = self.stored_token().await;
        match self.inner.verifier.verify(token.as_deref()).await {
            Ok(user) => {
                tracing::info!(user = %user.id, role = %user.role, "Session verified");
                self.inner
                    .state
                    .send_replace(AuthState::Authenticated(user));
                self.start_idle_monitor();
            }
            Err(VerifyError::NoCredential) => {
                tracing::debug!("No stored credential");
                self.inner.state.send_replace(AuthState::Unauthenticated);
            }
            Err(error) => {
                match error {
                    VerifyError::Rejected => tracing::warn!("Stored session rejected"),
                    _ => tracing::warn!("Verification unreachable, failing closed"),
                }
                if self.state().is_authenticated() {
                    // A re-check invalidated a live session
                    self.sign_out(SignOutReason::VerificationFailed).await;
                } else {
                    if let Err(e) = self.inner.credentials.clear_all().await {
                        tracing::warn!(error = %e, "Failed to clear credential scopes");
                    }
                    self.inner.state.send_replace(AuthState::Unauthenticated);
                }
            }
        }
        self.state()
    }

    /// Sign in with email and password.
    ///
    /// On success the credential is stored under the role's scope and the
    /// browser is handed off to the role's application.
    pub async fn login(&self, email: &str, password: &str) -> Result<Role, LoginError> {
        let envelope = self.inner.api.login(email, password).await.map_err(|e| {
            if e.is_transport() {
                tracing::warn!(error = %e, "Login request failed");
                LoginError::Unreachable
            } else {
                tracing::warn!(error = %e, "Login response unusable");
                LoginError::Rejected(MSG_LOGIN_FAILED.to_string())
            }
        })?;

        if !envelope.is_success() {
            let message = envelope
                .message
                .unwrap_or_else(|| MSG_LOGIN_FAILED.to_string());
            tracing::info!(message = %message, "Login rejected");
            return Err(LoginError::Rejected(message));
        }
        let Some(data) = envelope.data else {
            return Err(LoginError::Rejected(MSG_LOGIN_FAILED.to_string()));
        };

        let role = self.inner.router.resolve(&data.user.role.name).await?;

        if let Err(e) = self
            .inner
            .credentials
            .set(
                CredentialScope::Role(role),
                data.token.clone(),
                Some(role),
                Some(data.user.id.to_string()),
                self.inner.session.ttl(),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to persist login credential");
        }

        self.inner.router.redirect(role, &data.token)?;
        Ok(role)
    }

    /// Explicit logout.
    pub async fn logout(&self) {
        self.sign_out(SignOutReason::UserRequested).await;
    }

    /// Tear down this context (stops the idle monitor). The state channel
    /// stays readable for late observers.
    pub fn dispose(&self) {
        self.inner.idle.lock().stop();
        tracing::debug!("Auth context disposed");
    }

    /// The one `Authenticated → Unauthenticated` funnel.
    ///
    /// Idempotent: only the caller that wins the state transition performs
    /// the side effects, so racing idle expiry and explicit logout cannot
    /// double-navigate.
    async fn sign_out(&self, reason: SignOutReason) {
        let token = self.stored_token().await;

        let transitioned = self.inner.state.send_if_modified(|state| {
            if state.is_authenticated() {
                *state = AuthState::Unauthenticated;
                true
            } else {
                false
            }
        });
        if !transitioned {
            tracing::debug!(?reason, "Sign-out ignored, no authenticated session");
            return;
        }

        tracing::info!(?reason, "Signing out");
        self.inner.idle.lock().stop();

        if let Err(e) = self.inner.credentials.clear_all().await {
            tracing::warn!(error = %e, "Failed to clear credential scopes");
        }

        // Best-effort backend notification; local sign-out never waits on it
        if let Some(token) = token {
            let api = self.inner.api.clone();
            tokio::spawn(async move {
                if let Err(e) = api.logout(&token).await {
                    tracing::debug!(error = %e, "Logout notification failed");
                }
            });
        }

        self.inner.navigator.navigate(&self.inner.session.login_path);
    }

    fn start_idle_monitor(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.idle.lock().start(move || Self::idle_expired(weak));
    }

    async fn idle_expired(inner: Weak<AuthInner>) {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        // Detach: sign-out stops the monitor, which would otherwise abort
        // the very task running it
        let context = AuthContext { inner };
        tokio::spawn(async move {
            context.sign_out(SignOutReason::IdleTimeout).await;
        });
    }

    async fn stored_token(&self) -> Option<String> {
        for scope in self.scope_order() {
            if let Some(credential) = self.inner.credentials.get(scope).await {
                return Some(credential.token);
            }
        }
        None
    }

    /// Scope read order: this deployment's role scope first, then the shared
    /// handoff scope.
    fn scope_order(&self) -> Vec<CredentialScope> {
        match self.inner.session.scope {
            Some(role) => vec![CredentialScope::Role(role), CredentialScope::Shared],
            None => vec![CredentialScope::Shared],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration as StdDuration;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::super::navigator::testing::RecordingNavigator;
    use crate::core::config::{ApiConfig, OriginConfig};

    struct Harness {
        context: AuthContext,
        navigator: Arc<RecordingNavigator>,
        credentials: CredentialStore,
    }

    fn harness(server: &MockServer, session: SessionConfig) -> Harness {
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
        let context = AuthContext::new(session, credentials.clone(), api, router, navigator.clone());
        Harness {
            context,
            navigator,
            credentials,
        }
    }

    fn staff_session() -> SessionConfig {
        SessionConfig {
            scope: Some(Role::Staff),
            ..Default::default()
        }
    }

    async fn seed_staff_token(credentials: &CredentialStore, token: &str) {
        credentials
            .set(
                CredentialScope::Role(Role::Staff),
                token,
                Some(Role::Staff),
                None,
                chrono::Duration::days(7),
            )
            .await
            .unwrap();
    }

    async fn mock_me_success(server: &MockServer) -> httpmock::Mock<'_> {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/me");
                then.status(200).json_body(json!({
                    "status": "SUCCESS",
                    "data": { "id": 1, "name": "Lan", "role": { "name": "staff" } }
                }));
            })
            .await
    }

    #[tokio::test]
    async fn test_bootstrap_success_authenticates_and_starts_idle_monitor() {
        let server = MockServer::start_async().await;
        mock_me_success(&server).await;

        let h = harness(&server, staff_session());
        seed_staff_token(&h.credentials, "tok-1").await;

        assert_eq!(h.context.state(), AuthState::Unknown);
        let state = h.context.check_session().await;
        assert!(state.is_authenticated());
        assert_eq!(h.context.user().unwrap().role, Role::Staff);
        assert!(h.context.activity_handle().is_some());
    }

    #[tokio::test]
    async fn test_bootstrap_rejected_clears_scopes_silently() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/me");
                then.status(401).json_body(json!({ "status": "FAILED" }));
            })
            .await;

        let h = harness(&server, staff_session());
        seed_staff_token(&h.credentials, "tok-expired").await;

        let state = h.context.check_session().await;
        assert_eq!(state, AuthState::Unauthenticated);
        assert!(h.credentials.get(CredentialScope::Role(Role::Staff)).await.is_none());
        // The route guard owns the redirect; bootstrap itself must not navigate
        assert!(h.navigator.navigations().is_empty());
        assert!(h.context.activity_handle().is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_without_credential_never_calls_backend() {
        let server = MockServer::start_async().await;
        let mock = mock_me_success(&server).await;

        let h = harness(&server, staff_session());
        let state = h.context.check_session().await;
        assert_eq!(state, AuthState::Unauthenticated);
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_bootstrap_verifies_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/me");
                then.status(200)
                    .delay(StdDuration::from_millis(100))
                    .json_body(json!({
                        "status": "SUCCESS",
                        "data": { "id": 1, "role": { "name": "staff" } }
                    }));
            })
            .await;

        let h = harness(&server, staff_session());
        seed_staff_token(&h.credentials, "tok-1").await;

        let (a, b) = tokio::join!(h.context.check_session(), h.context.check_session());
        assert!(a.is_authenticated());
        assert_eq!(a, b);
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_double_logout_navigates_once() {
        let server = MockServer::start_async().await;
        mock_me_success(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/logout");
                then.status(200).json_body(json!({ "status": "SUCCESS" }));
            })
            .await;

        let h = harness(&server, staff_session());
        seed_staff_token(&h.credentials, "tok-1").await;
        h.context.check_session().await;

        tokio::join!(h.context.logout(), h.context.logout());

        assert_eq!(h.context.state(), AuthState::Unauthenticated);
        assert_eq!(h.navigator.navigations(), vec!["/login".to_string()]);
        assert!(h.credentials.get(CredentialScope::Role(Role::Staff)).await.is_none());
        assert!(h.context.activity_handle().is_none());
    }

    #[tokio::test]
    async fn test_logout_succeeds_locally_when_notification_fails() {
        let server = MockServer::start_async().await;
        mock_me_success(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/logout");
                then.status(500);
            })
            .await;

        let h = harness(&server, staff_session());
        seed_staff_token(&h.credentials, "tok-1").await;
        h.context.check_session().await;

        h.context.logout().await;
        assert_eq!(h.context.state(), AuthState::Unauthenticated);
        assert_eq!(h.navigator.navigations().len(), 1);
    }

    #[tokio::test]
    async fn test_login_admin_stores_scoped_credential_and_redirects() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login");
                then.status(200).json_body(json!({
                    "status": "SUCCESS",
                    "message": "ok",
                    "data": {
                        "token": "tok-admin",
                        "user": { "id": 5, "name": "Quản trị", "role": { "name": "admin" } }
                    }
                }));
            })
            .await;

        let h = harness(&server, SessionConfig::default());
        let role = h.context.login("admin@spa.vn", "secret").await.unwrap();
        assert_eq!(role, Role::Admin);

        let credential = h
            .credentials
            .get(CredentialScope::Role(Role::Admin))
            .await
            .unwrap();
        assert_eq!(credential.token, "tok-admin");
        assert_eq!(credential.role, Some(Role::Admin));
        assert_eq!(credential.user_id.as_deref(), Some("5"));
        let remaining = credential.expires_at - chrono::Utc::now();
        assert!(remaining > chrono::Duration::days(6));
        assert!(remaining <= chrono::Duration::days(7));

        let navigations = h.navigator.navigations();
        assert_eq!(navigations.len(), 1);
        assert!(navigations[0].starts_with("http://localhost:3003/"));
        assert!(navigations[0].contains("token=tok-admin"));
    }

    #[tokio::test]
    async fn test_login_unknown_role_clears_and_surfaces_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login");
                then.status(200).json_body(json!({
                    "status": "SUCCESS",
                    "data": {
                        "token": "tok-x",
                        "user": { "id": 6, "role": { "name": "manager_x" } }
                    }
                }));
            })
            .await;

        let h = harness(&server, SessionConfig::default());
        h.credentials
            .set(CredentialScope::Shared, "stale", None, None, chrono::Duration::days(7))
            .await
            .unwrap();

        let error = h.context.login("x@spa.vn", "secret").await.unwrap_err();
        assert_eq!(error, LoginError::InvalidRole);
        assert_eq!(error.to_string(), "Vai trò không hợp lệ");
        assert!(h.navigator.navigations().is_empty());
        for scope in CredentialScope::all() {
            assert!(h.credentials.get(scope).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_login_rejected_surfaces_backend_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login");
                then.status(401).json_body(json!({
                    "status": "FAILED",
                    "message": "Sai mật khẩu"
                }));
            })
            .await;

        let h = harness(&server, SessionConfig::default());
        let error = h.context.login("a@spa.vn", "wrong").await.unwrap_err();
        assert_eq!(error.to_string(), "Sai mật khẩu");
    }

    #[tokio::test]
    async fn test_login_unreachable_backend() {
        let navigator = Arc::new(RecordingNavigator::default());
        let credentials = CredentialStore::in_memory();
        let api = Arc::new(
            ApiClient::new(&ApiConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                timeout_secs: 1,
            })
            .unwrap(),
        );
        let router = RoleRouter::new(
            OriginConfig::default().destinations().unwrap(),
            credentials.clone(),
            navigator.clone(),
        );
        let context = AuthContext::new(
            SessionConfig::default(),
            credentials,
            api,
            router,
            navigator,
        );

        let error = context.login("a@spa.vn", "secret").await.unwrap_err();
        assert_eq!(error, LoginError::Unreachable);
        assert_eq!(error.to_string(), "Lỗi kết nối server");
    }

    #[tokio::test]
    async fn test_idle_expiry_runs_full_logout_path() {
        let server = MockServer::start_async().await;
        mock_me_success(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/logout");
                then.status(200).json_body(json!({ "status": "SUCCESS" }));
            })
            .await;

        let session = SessionConfig {
            idle_timeout_secs: 1,
            scope: Some(Role::Staff),
            ..Default::default()
        };
        let h = harness(&server, session);
        seed_staff_token(&h.credentials, "tok-1").await;
        h.context.check_session().await;
        assert!(h.context.state().is_authenticated());

        tokio::time::sleep(StdDuration::from_millis(1500)).await;

        assert_eq!(h.context.state(), AuthState::Unauthenticated);
        assert_eq!(h.navigator.navigations(), vec!["/login".to_string()]);
        assert!(h.credentials.get(CredentialScope::Role(Role::Staff)).await.is_none());
    }

    #[tokio::test]
    async fn test_record_interaction_without_session_is_noop() {
        let server = MockServer::start_async().await;
        let h = harness(&server, staff_session());
        // No session yet; must not panic
        h.context.record_interaction(Interaction::KeyPress);
        h.context.dispose();
    }
}
