//! Composition root

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::api::ApiClient;
use crate::auth::{
    AuthContext, AuthState, CredentialBackend, CredentialStore, Navigator, RoleRouter, RouteGuard,
};
use crate::core::config::{AppConfig, CredentialBackendKind};
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};

/// Process-wide composition root for one front-end shell
///
/// Wires configuration, credential storage, the API client, and the auth
/// context together. One instance per process; the embedding shell owns its
/// lifecycle (`init` at startup, `dispose` on teardown).
pub struct PortalApp {
    pub config: AppConfig,
    pub credentials: CredentialStore,
    pub api: Arc<ApiClient>,
    pub auth: AuthContext,
}

impl PortalApp {
    /// Wire every component from configuration.
    pub async fn init(config: AppConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let backend = match config.credentials.backend {
            CredentialBackendKind::Memory => CredentialBackend::Memory,
            CredentialBackendKind::File => CredentialBackend::File(config.credentials_path()),
        };
        let credentials = CredentialStore::init(backend)
            .await
            .context("Failed to initialize credential store")?;

        let api = Arc::new(ApiClient::new(&config.api)?);
        let router = RoleRouter::new(
            config.origins.destinations()?,
            credentials.clone(),
            navigator.clone(),
        );
        let auth = AuthContext::new(
            config.session.clone(),
            credentials.clone(),
            api.clone(),
            router,
            navigator,
        );

        tracing::debug!("Portal app initialized");
        Ok(Self {
            config,
            credentials,
            api,
            auth,
        })
    }

    /// Adopt any handoff token from the current URL, then run the session
    /// check. Returns the settled state.
    pub async fn bootstrap(&self, current_url: Option<&Url>) -> AuthState {
        if let Some(url) = current_url {
            self.auth.adopt_handoff(url).await;
        }
        self.auth.check_session().await
    }

    /// Guard for a protected route subtree
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(&self.auth)
    }

    /// Tear down background resources.
    pub fn dispose(&self) {
        self.auth.dispose();
        tracing::debug!("Portal app disposed");
    }

    /// Initialize logging for the embedding shell.
    pub fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}
