//! Role-scoped credential storage
//!
//! Persists the bearer token and role tag across page reloads. Each role's
//! application reads its own scope (`admin_token`, `staff_token`, ...) plus a
//! shared fallback scope (`token`) written by cross-application handoffs.
//! Exactly one backing strategy is configured at startup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use super::role::Role;
use crate::core::constants::SHARED_SCOPE_KEY;

/// Credential storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialBackend {
    /// Process-lifetime storage; nothing survives a reload
    Memory,
    /// JSON vault file
    File(PathBuf),
}

impl CredentialBackend {
    /// Human-readable backend name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }

    /// Whether credentials survive a process restart
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

/// Storage namespace for one credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialScope {
    /// Scope owned by one role's application
    Role(Role),
    /// Shared fallback scope written by cross-application handoffs
    Shared,
}

impl CredentialScope {
    /// Storage key (`admin_token`, `staff_token`, ..., or the shared `token`)
    pub fn key(&self) -> String {
        match self {
            Self::Role(role) => format!("{}_token", role),
            Self::Shared => SHARED_SCOPE_KEY.to_string(),
        }
    }

    /// Every scope, in a stable order
    pub fn all() -> impl Iterator<Item = CredentialScope> {
        Role::ALL
            .into_iter()
            .map(CredentialScope::Role)
            .chain(std::iter::once(CredentialScope::Shared))
    }
}

/// A persisted bearer credential
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    /// Known for role scopes; a freshly adopted handoff has no role yet
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("role", &self.role)
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Vault holding every scope's credential
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CredentialVault {
    entries: HashMap<String, Credential>,
}

/// Role-scoped credential store
///
/// Entries are cached in memory; writes update memory first and then the
/// configured backend. Absence is a normal result, never an error.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    backend: CredentialBackend,
    vault: Arc<RwLock<CredentialVault>>,
    /// Serializes save operations
    save_mutex: Arc<Mutex<()>>,
}

impl CredentialStore {
    /// Initialize the store, loading any persisted vault.
    pub async fn init(backend: CredentialBackend) -> Result<Self> {
        let vault = match &backend {
            CredentialBackend::File(path) => Self::load_vault(path).await?,
            CredentialBackend::Memory => CredentialVault::default(),
        };
        tracing::debug!(backend = backend.name(), "Credential store initialized");
        Ok(Self {
            backend,
            vault: Arc::new(RwLock::new(vault)),
            save_mutex: Arc::new(Mutex::new(())),
        })
    }

    /// In-memory store (tests, ephemeral deployments)
    pub fn in_memory() -> Self {
        Self {
            backend: CredentialBackend::Memory,
            vault: Arc::new(RwLock::new(CredentialVault::default())),
            save_mutex: Arc::new(Mutex::new(())),
        }
    }

    pub fn backend(&self) -> &CredentialBackend {
        &self.backend
    }

    /// Write a credential under a scope, replacing any existing entry.
    pub async fn set(
        &self,
        scope: CredentialScope,
        token: impl Into<String>,
        role: Option<Role>,
        user_id: Option<String>,
        ttl: Duration,
    ) -> Result<()> {
        let credential = Credential {
            token: token.into(),
            role,
            user_id,
            expires_at: Utc::now() + ttl,
        };
        {
            let mut vault = self.vault.write().await;
            vault.entries.insert(scope.key(), credential);
        }
        self.save().await?;
        tracing::debug!(scope = %scope.key(), "Stored credential");
        Ok(())
    }

    /// Read a scope's credential. Absent or expired entries yield `None`.
    pub async fn get(&self, scope: CredentialScope) -> Option<Credential> {
        let vault = self.vault.read().await;
        vault
            .entries
            .get(&scope.key())
            .filter(|credential| !credential.is_expired())
            .cloned()
    }

    /// Remove one scope. Clearing an absent scope is not an error.
    pub async fn clear(&self, scope: CredentialScope) -> Result<()> {
        let removed = {
            let mut vault = self.vault.write().await;
            vault.entries.remove(&scope.key()).is_some()
        };
        if removed {
            self.save().await?;
            tracing::debug!(scope = %scope.key(), "Cleared credential");
        }
        Ok(())
    }

    /// Remove every scope.
    pub async fn clear_all(&self) -> Result<()> {
        let removed = {
            let mut vault = self.vault.write().await;
            let had_entries = !vault.entries.is_empty();
            vault.entries.clear();
            had_entries
        };
        if removed {
            self.save().await?;
            tracing::debug!("Cleared all credential scopes");
        }
        Ok(())
    }

    async fn load_vault(path: &PathBuf) -> Result<CredentialVault> {
        match tokio::fs::read_to_string(path).await {
            Ok(json) => {
                let vault = serde_json::from_str(&json)
                    .context("Failed to parse credential vault")?;
                Ok(vault)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CredentialVault::default()),
            Err(e) => Err(anyhow!("Failed to load credential vault: {}", e)),
        }
    }

    async fn save(&self) -> Result<()> {
        let CredentialBackend::File(path) = &self.backend else {
            return Ok(());
        };
        let _guard = self.save_mutex.lock().await;
        let json = {
            let vault = self.vault.read().await;
            serde_json::to_string_pretty(&*vault)
                .context("Failed to serialize credential vault")?
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create data directory")?;
        }
        tokio::fs::write(path, json)
            .await
            .context("Failed to write credential vault")?;
        Ok(())
    }
}
