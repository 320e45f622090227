//! Centralized configuration for Harvest Migrate.
//!
//! Constant groups for the Harvest endpoints, OAuth, and HTTP behavior, plus
//! the runtime settings read from the environment.

use crate::error::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Harvest endpoint configuration.
pub struct ApiConfig;

impl ApiConfig {
    pub const API_BASE: &'static str = "https://api.harvestapp.com/v2";
    pub const ID_BASE: &'static str = "https://id.getharvest.com";
    pub const USER_AGENT: &'static str = "Harvest Time Migration Tool";
    pub const PER_PAGE: u32 = 2000;
    /// Product name of time-tracking accounts in the ID API (Forecast
    /// accounts are listed alongside).
    pub const HARVEST_PRODUCT: &'static str = "harvest";
}

/// OAuth configuration.
pub struct AuthConfig;

impl AuthConfig {
    pub const CLIENT_ID_ENV: &'static str = "HARVEST_CLIENT_ID";
    pub const CLIENT_SECRET_ENV: &'static str = "HARVEST_CLIENT_SECRET";
    pub const REDIRECT_URI_ENV: &'static str = "HARVEST_REDIRECT_URI";
    pub const SCOPE_ENV: &'static str = "HARVEST_SCOPE";
    pub const TOKEN_STORE_ENV: &'static str = "HARVEST_TOKEN_STORE";
    pub const DEFAULT_REDIRECT_URI: &'static str = "http://localhost:3000/oauth/callback";
    pub const DEFAULT_SCOPE: &'static str = "all";
    pub const CONFIG_DIR_NAME: &'static str = "harvest-migrate";
    pub const TOKEN_STORE_FILENAME: &'static str = "tokens.json";
    /// Tokens are treated as expired this long before their real expiry.
    pub const EXPIRY_BUFFER: Duration = Duration::from_secs(300);
    /// How long the local callback listener waits for the browser redirect.
    pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
    pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
}

/// Which side of the migration a credential or directory call pertains to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Source,
    Destination,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Source => "source",
            AccountRole::Destination => "destination",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth application settings, read from the environment.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl OAuthSettings {
    /// Load settings from the process environment, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (client_id, client_secret) = match (
            non_empty(AuthConfig::CLIENT_ID_ENV),
            non_empty(AuthConfig::CLIENT_SECRET_ENV),
        ) {
            (Some(id), Some(secret)) => (id, secret),
            _ => {
                return Err(MigrateError::Config {
                    message: format!(
                        "{} and {} must be set (environment or .env file)",
                        AuthConfig::CLIENT_ID_ENV,
                        AuthConfig::CLIENT_SECRET_ENV
                    ),
                })
            }
        };

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: non_empty(AuthConfig::REDIRECT_URI_ENV)
                .unwrap_or_else(|| AuthConfig::DEFAULT_REDIRECT_URI.to_string()),
            scope: non_empty(AuthConfig::SCOPE_ENV)
                .unwrap_or_else(|| AuthConfig::DEFAULT_SCOPE.to_string()),
        })
    }
}

/// Resolve the token store location.
///
/// Order: explicit path, `HARVEST_TOKEN_STORE`, then
/// `{config_dir}/harvest-migrate/tokens.json`.
pub fn token_store_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Ok(path) = std::env::var(AuthConfig::TOKEN_STORE_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let config_dir = dirs::config_dir().ok_or_else(|| MigrateError::Config {
        message: "Could not determine platform config directory".to_string(),
    })?;
    Ok(config_dir
        .join(AuthConfig::CONFIG_DIR_NAME)
        .join(AuthConfig::TOKEN_STORE_FILENAME))
}
