//! Per-role OAuth token persistence.
//!
//! The store is a single JSON file holding at most one account per role:
//!
//! ```json
//! {
//!   "source": { "id": 123, "name": "Acme", "tokens": { ... } },
//!   "destination": { "id": 456, "name": "Acme Labs", "tokens": { ... } }
//! }
//! ```
//!
//! Writes go through a temp file, fsync, and rename so a crash never leaves
//! a truncated store behind.

use crate::config::{AccountRole, AuthConfig};
use crate::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tokens issued by the Harvest ID service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds, counted from `created_at`.
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    /// Unix timestamp (seconds) at which the tokens were received.
    pub created_at: i64,
}

impl OAuthTokens {
    /// Whether the access token is still usable at `now` (unix seconds).
    ///
    /// Tokens are considered expired [`AuthConfig::EXPIRY_BUFFER`] early.
    pub fn is_valid_at(&self, now: i64) -> bool {
        let buffer = AuthConfig::EXPIRY_BUFFER.as_secs() as i64;
        now < self.created_at + self.expires_in - buffer
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(chrono::Utc::now().timestamp())
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// The Harvest account selected for a role, with its tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccount {
    pub id: u64,
    pub name: String,
    pub tokens: OAuthTokens,
}

/// Contents of the token store file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<StoredAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<StoredAccount>,
}

impl StoredTokens {
    pub fn get(&self, role: AccountRole) -> Option<&StoredAccount> {
        match role {
            AccountRole::Source => self.source.as_ref(),
            AccountRole::Destination => self.destination.as_ref(),
        }
    }

    pub fn set(&mut self, role: AccountRole, account: Option<StoredAccount>) {
        match role {
            AccountRole::Source => self.source = account,
            AccountRole::Destination => self.destination = account,
        }
    }
}

/// JSON file holding the tokens of both roles.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the store. A missing or unreadable file yields an empty store.
    pub fn load(&self) -> StoredTokens {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoredTokens::default(),
            Err(e) => {
                warn!("Failed to read token store {}: {}", self.path.display(), e);
                return StoredTokens::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Ignoring corrupt token store {}: {}", self.path.display(), e);
                StoredTokens::default()
            }
        }
    }

    /// Read the account stored for one role.
    pub fn account(&self, role: AccountRole) -> Option<StoredAccount> {
        self.load().get(role).cloned()
    }

    /// Replace (or with `None`, remove) the account of one role.
    pub fn update(&self, role: AccountRole, account: Option<StoredAccount>) -> Result<()> {
        let mut tokens = self.load();
        tokens.set(role, account);
        self.save(&tokens)
    }

    /// Write the whole store atomically.
    pub fn save(&self, tokens: &StoredTokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| MigrateError::io_with_path(e, parent))?;
            }
        }

        let serialized = serde_json::to_string_pretty(tokens)?;
        let temp_path = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| MigrateError::io_with_path(e, &temp_path))?;
            file.write_all(serialized.as_bytes())
                .map_err(|e| MigrateError::io_with_path(e, &temp_path))?;
            file.sync_all()
                .map_err(|e| MigrateError::io_with_path(e, &temp_path))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))
                .map_err(|e| MigrateError::io_with_path(e, &temp_path))?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(MigrateError::io_with_path(e, &self.path));
        }

        debug!("Saved token store to {}", self.path.display());
        Ok(())
    }
}
