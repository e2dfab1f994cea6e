//! Thin REST client for the salon backend

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::json;

use super::types::{ApiEnvelope, ClientError, LoginData, UserPayload};
use crate::core::config::ApiConfig;
use crate::core::constants::{API_LOGIN_PATH, API_LOGOUT_PATH, API_ME_PATH, APP_NAME};

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP client for the backend REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client from connection settings.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid API base URL: {}", config.base_url))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("{}/{}", APP_NAME, CURRENT_VERSION))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// `POST /login`
    ///
    /// The envelope is decoded regardless of HTTP status: the backend reports
    /// login rejection inside the envelope, not through the status line.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ApiEnvelope<LoginData>, ClientError> {
        let response = self
            .http
            .post(self.endpoint(API_LOGIN_PATH))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        match serde_json::from_slice(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ClientError::Status(status)),
            Err(e) => Err(ClientError::Decode(e)),
        }
    }

    /// `GET /me` with a bearer credential
    pub async fn me(&self, token: &str) -> Result<ApiEnvelope<UserPayload>, ClientError> {
        let response = self
            .http
            .get(self.endpoint(API_ME_PATH))
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `POST /logout`, best-effort; callers ignore the outcome beyond logging
    pub async fn logout(&self, token: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint(API_LOGOUT_PATH))
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }
        Ok(())
    }
}
