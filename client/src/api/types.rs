//! Wire types for the backend REST contract
//!
//! Every endpoint wraps its payload in a `{status, message, data}` envelope;
//! `status == "SUCCESS"` is the only success marker, HTTP status
//! notwithstanding.

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::core::constants::STATUS_SUCCESS;

/// Standard backend response envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Whether the backend reported success
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// User id as the backend sends it (numeric in some tables, string in others)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

/// Role descriptor nested in the user payload
#[derive(Debug, Clone, Deserialize)]
pub struct RolePayload {
    pub name: String,
}

/// User payload as returned by `/login` and `/me`
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: UserId,
    #[serde(default, alias = "fullName")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "avatarUrl")]
    pub avatar: Option<String>,
    pub role: RolePayload,
}

/// Payload of a successful `/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub user: UserPayload,
}

/// Transport-level and protocol-level client failures
#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend answered with a non-success HTTP status and no usable envelope
    #[error("backend returned HTTP {0}")]
    Status(StatusCode),
    /// The request never completed (DNS, connect, timeout)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body did not match the expected envelope
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// True when the backend was never reached (as opposed to answering with
    /// an error).
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
