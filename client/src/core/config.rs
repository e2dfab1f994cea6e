//! Application configuration
//!
//! Configuration is layered: built-in defaults, then an optional JSON config
//! file, then environment variable overrides. Origins for the role-specific
//! applications are configuration, never literals in code.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::constants::{
    APP_DOT_FOLDER, APP_NAME_LOWER, CONFIG_FILE_NAME, CREDENTIALS_FILE_NAME,
    DEFAULT_ADMIN_ORIGIN, DEFAULT_API_BASE_URL, DEFAULT_CUSTOMER_ORIGIN,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_SESSION_TTL_DAYS,
    DEFAULT_STAFF_ORIGIN, ENV_ADMIN_ORIGIN, ENV_API_BASE_URL, ENV_CONFIG,
    ENV_CREDENTIAL_BACKEND, ENV_CUSTOMER_ORIGIN, ENV_DATA_DIR, ENV_IDLE_TIMEOUT_SECS,
    ENV_STAFF_ORIGIN, LOGIN_PATH,
};
use crate::auth::Role;

// =============================================================================
// Credential Backend Enum
// =============================================================================

/// Credential storage backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackendKind {
    /// Process-lifetime storage only (nothing survives a reload)
    Memory,
    /// JSON vault file in the data directory
    #[default]
    File,
}

impl fmt::Display for CredentialBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialBackendKind::Memory => write!(f, "memory"),
            CredentialBackendKind::File => write!(f, "file"),
        }
    }
}

// =============================================================================
// API
// =============================================================================

/// Backend API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend REST API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Origins
// =============================================================================

/// Origins of the role-specific applications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    pub admin: String,
    pub staff: String,
    pub customer: String,
    /// Managers use the staff back office unless given their own origin
    pub manager: Option<String>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            admin: DEFAULT_ADMIN_ORIGIN.to_string(),
            staff: DEFAULT_STAFF_ORIGIN.to_string(),
            customer: DEFAULT_CUSTOMER_ORIGIN.to_string(),
            manager: None,
        }
    }
}

impl OriginConfig {
    /// Build the role → destination table.
    pub fn destinations(&self) -> Result<HashMap<Role, Url>> {
        let mut table = HashMap::new();
        table.insert(Role::Admin, parse_origin("admin", &self.admin)?);
        table.insert(Role::Staff, parse_origin("staff", &self.staff)?);
        table.insert(Role::Customer, parse_origin("customer", &self.customer)?);
        let manager = self.manager.as_deref().unwrap_or(&self.staff);
        table.insert(Role::Manager, parse_origin("manager", manager)?);
        Ok(table)
    }
}

fn parse_origin(name: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("Invalid {} origin: {}", name, raw))
}

// =============================================================================
// Session
// =============================================================================

/// Session behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of inactivity before forced logout
    pub idle_timeout_secs: u64,
    /// Credential lifetime in days
    pub ttl_days: i64,
    /// Login entry point path
    pub login_path: String,
    /// Role scope this deployment reads before the shared scope
    pub scope: Option<Role>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            ttl_days: DEFAULT_SESSION_TTL_DAYS,
            login_path: LOGIN_PATH.to_string(),
            scope: None,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.ttl_days)
    }
}

// =============================================================================
// Credential Storage
// =============================================================================

/// Credential storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    pub backend: CredentialBackendKind,
    /// Vault file path override (defaults to the data directory)
    pub path: Option<PathBuf>,
}

// =============================================================================
// AppConfig
// =============================================================================

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub origins: OriginConfig,
    pub session: SessionConfig,
    pub credentials: CredentialConfig,
}

impl AppConfig {
    /// Load configuration: defaults, then the config file (if present), then
    /// environment overrides. Validates before returning.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path();
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config file path (`VELORA_CONFIG` override, else the data
    /// directory).
    fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return PathBuf::from(path);
        }
        data_dir().join(CONFIG_FILE_NAME)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_API_BASE_URL) {
            self.api.base_url = url;
        }
        if let Ok(origin) = std::env::var(ENV_ADMIN_ORIGIN) {
            self.origins.admin = origin;
        }
        if let Ok(origin) = std::env::var(ENV_STAFF_ORIGIN) {
            self.origins.staff = origin;
        }
        if let Ok(origin) = std::env::var(ENV_CUSTOMER_ORIGIN) {
            self.origins.customer = origin;
        }
        if let Ok(secs) = std::env::var(ENV_IDLE_TIMEOUT_SECS) {
            self.session.idle_timeout_secs = secs
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_IDLE_TIMEOUT_SECS, secs))?;
        }
        if let Ok(backend) = std::env::var(ENV_CREDENTIAL_BACKEND) {
            self.credentials.backend = match backend.to_lowercase().as_str() {
                "memory" => CredentialBackendKind::Memory,
                "file" => CredentialBackendKind::File,
                other => bail!(
                    "Invalid {}: {} (valid: memory, file)",
                    ENV_CREDENTIAL_BACKEND,
                    other
                ),
            };
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.api.base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.api.base_url))?;
        self.origins.destinations()?;
        if self.session.idle_timeout_secs == 0 {
            bail!("Idle timeout must be nonzero");
        }
        if self.session.ttl_days <= 0 {
            bail!("Session TTL must be positive");
        }
        Ok(())
    }

    /// Resolved vault file path for the file credential backend.
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join(CREDENTIALS_FILE_NAME))
    }
}

/// Application data directory (`VELORA_DATA_DIR` override, else the platform
/// data dir, else a dotfolder in the home directory).
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return PathBuf::from(dir);
    }
    if let Some(base) = dirs::data_dir() {
        return base.join(APP_NAME_LOWER);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DOT_FOLDER)
}
