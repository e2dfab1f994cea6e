//! Session verification against the identity endpoint

use std::sync::Arc;

use thiserror::Error;

use super::role::Role;
use crate::api::{ApiClient, ClientError, UserPayload};

/// Why a session could not be verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// No token to check; not surfaced to the user
    #[error("no credential present")]
    NoCredential,
    /// The backend answered and denied the token
    #[error("session rejected by backend")]
    Rejected,
    /// The backend could not be reached; fail closed
    #[error("backend unreachable")]
    Unreachable,
}

/// Normalized result of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
}

impl AuthenticatedUser {
    /// Normalize a raw user payload. `None` when the role is outside the
    /// known set.
    fn from_payload(payload: UserPayload) -> Option<Self> {
        let role = Role::parse(&payload.role.name)?;
        let id = payload.id.to_string();
        let display_name = payload.name.or(payload.email).unwrap_or_else(|| id.clone());
        Some(Self {
            id,
            display_name,
            avatar_url: payload.avatar,
            role,
        })
    }
}

/// Validates bearer credentials against `GET /me`
#[derive(Debug, Clone)]
pub struct SessionVerifier {
    api: Arc<ApiClient>,
}

impl SessionVerifier {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Verify a bearer token with a single identity request.
    ///
    /// An absent token short-circuits without touching the network. The
    /// verifier never mutates storage; callers decide what a failure clears.
    pub async fn verify(&self, token: Option<&str>) -> Result<AuthenticatedUser, VerifyError> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(VerifyError::NoCredential),
        };

        let envelope = match self.api.me(token).await {
            Ok(envelope) => envelope,
            Err(ClientError::Status(status)) => {
                tracing::debug!(%status, "Identity endpoint denied the session");
                return Err(VerifyError::Rejected);
            }
            Err(ClientError::Decode(e)) => {
                tracing::warn!(error = %e, "Identity endpoint returned a malformed body");
                return Err(VerifyError::Rejected);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Identity endpoint unreachable");
                return Err(VerifyError::Unreachable);
            }
        };

        if !envelope.is_success() {
            tracing::debug!(status = %envelope.status, "Identity endpoint reported failure");
            return Err(VerifyError::Rejected);
        }

        let payload = envelope.data.ok_or(VerifyError::Rejected)?;
        let raw_role = payload.role.name.clone();
        AuthenticatedUser::from_payload(payload).ok_or_else(|| {
            tracing::warn!(role = %raw_role, "Identity endpoint returned an unknown role");
            VerifyError::Rejected
        })
    }
}
