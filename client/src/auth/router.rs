//! Role-based cross-application dispatch
//!
//! Maps a verified role tag to the application origin that serves it and
//! performs the redirect, carrying the credential as a one-shot query
//! parameter the destination consumes and strips.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Url;
use thiserror::Error;

use super::credentials::CredentialStore;
use super::navigator::Navigator;
use super::role::Role;
use crate::core::constants::{MSG_INVALID_ROLE, TOKEN_QUERY_PARAM};

/// Dispatch failure; both variants force credential removal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Role string outside the known set
    #[error("unknown role: {raw}")]
    UnknownRole { raw: String },
    /// Known role with no configured destination
    #[error("no destination configured for role {role}")]
    NoDestination { role: Role },
}

impl RouteError {
    /// Inline message shown to the user
    pub fn user_message(&self) -> &'static str {
        MSG_INVALID_ROLE
    }
}

/// Maps roles to application origins and performs redirects
#[derive(Clone)]
pub struct RoleRouter {
    destinations: HashMap<Role, Url>,
    credentials: CredentialStore,
    navigator: Arc<dyn Navigator>,
}

impl RoleRouter {
    pub fn new(
        destinations: HashMap<Role, Url>,
        credentials: CredentialStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            destinations,
            credentials,
            navigator,
        }
    }

    /// Destination origin for a role, if configured
    pub fn destination(&self, role: Role) -> Option<&Url> {
        self.destinations.get(&role)
    }

    /// Parse a raw role tag and check it has a destination.
    ///
    /// Any failure clears every credential scope and performs no redirect.
    pub async fn resolve(&self, raw: &str) -> Result<Role, RouteError> {
        let Some(role) = Role::parse(raw) else {
            tracing::warn!(role = raw, "Unknown role, clearing session");
            self.clear_credentials().await;
            return Err(RouteError::UnknownRole {
                raw: raw.to_string(),
            });
        };
        if !self.destinations.contains_key(&role) {
            tracing::warn!(%role, "No destination for role, clearing session");
            self.clear_credentials().await;
            return Err(RouteError::NoDestination { role });
        }
        Ok(role)
    }

    /// Redirect the browser to a resolved role's application, carrying the
    /// credential as a one-shot query parameter.
    pub fn redirect(&self, role: Role, token: &str) -> Result<(), RouteError> {
        let Some(origin) = self.destinations.get(&role) else {
            return Err(RouteError::NoDestination { role });
        };
        let mut url = origin.clone();
        url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, token);
        tracing::info!(%role, destination = %origin, "Redirecting to role application");
        self.navigator.navigate(url.as_str());
        Ok(())
    }

    /// Resolve and redirect in one step.
    pub async fn dispatch(&self, raw: &str, token: &str) -> Result<Role, RouteError> {
        let role = self.resolve(raw).await?;
        self.redirect(role, token)?;
        Ok(role)
    }

    async fn clear_credentials(&self) {
        if let Err(e) = self.credentials.clear_all().await {
            tracing::warn!(error = %e, "Failed to clear credential scopes");
        }
    }
}

/// Consume a one-shot handoff token from the current URL.
///
/// Returns the token and history-replaces the visible URL with one that no
/// longer carries it.
pub fn consume_handoff_token(navigator: &dyn Navigator, current: &Url) -> Option<String> {
    let token = current
        .query_pairs()
        .find(|(key, _)| key == TOKEN_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())?;

    let remaining: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(key, _)| key != TOKEN_QUERY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut stripped = current.clone();
    if remaining.is_empty() {
        stripped.set_query(None);
    } else {
        stripped
            .query_pairs_mut()
            .clear()
            .extend_pairs(remaining.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    navigator.replace(stripped.as_str());
    Some(token)
}
