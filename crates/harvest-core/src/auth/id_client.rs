//! Client for the Harvest ID service (OAuth2 endpoints and account listing).

use crate::auth::store::OAuthTokens;
use crate::config::{ApiConfig, OAuthSettings};
use crate::harvest::HarvestAccount;
use crate::network::{error_message, HttpClient};
use crate::{MigrateError, Result};
use serde::Deserialize;
use tracing::{debug, info};

/// Token endpoint response, before `created_at` is stamped.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn stamp(self, now: i64) -> OAuthTokens {
        OAuthTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_in: self.expires_in,
            scope: self.scope,
            created_at: now,
        }
    }
}

/// Response from `GET /api/v2/accounts`.
#[derive(Debug, Deserialize)]
struct AccountsResponse {
    #[serde(default)]
    accounts: Vec<HarvestAccount>,
}

/// OAuth2 client for `id.getharvest.com`.
#[derive(Debug, Clone)]
pub struct HarvestIdClient {
    http: HttpClient,
    settings: OAuthSettings,
    base_url: String,
}

impl HarvestIdClient {
    pub fn new(http: HttpClient, settings: OAuthSettings) -> Self {
        Self::with_base_url(http, settings, ApiConfig::ID_BASE)
    }

    /// Target a different ID service base URL (used by tests).
    pub fn with_base_url(http: HttpClient, settings: OAuthSettings, base_url: &str) -> Self {
        Self {
            http,
            settings,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Browser URL that starts the authorization-code flow.
    pub fn authorize_url(&self, state: &str) -> Result<String> {
        let url = url::Url::parse_with_params(
            &format!("{}/oauth2/authorize", self.base_url),
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("response_type", "code"),
                ("scope", self.settings.scope.as_str()),
                ("state", state),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| MigrateError::Config {
            message: format!("Invalid Harvest ID base URL {}: {}", self.base_url, e),
        })?;
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthTokens> {
        info!("Exchanging authorization code for tokens");
        self.token_request(&[
            ("code", code),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ])
        .await
    }

    /// Obtain fresh tokens with a refresh token.
    pub async fn refresh(&self, tokens: &OAuthTokens) -> Result<OAuthTokens> {
        info!("Refreshing access token");
        self.token_request(&[
            ("refresh_token", tokens.refresh_token.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    /// Harvest time-tracking accounts reachable with `access_token`.
    ///
    /// Accounts of other products (Forecast) are filtered out.
    pub async fn list_accounts(&self, access_token: &str) -> Result<Vec<HarvestAccount>> {
        let url = format!("{}/api/v2/accounts", self.base_url);
        let response = self
            .http
            .execute(|client| client.get(&url).bearer_auth(access_token))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MigrateError::OAuth {
                message: format!(
                    "Failed to retrieve Harvest accounts: {}",
                    error_message(status, &body)
                ),
            });
        }

        let parsed: AccountsResponse = response.json().await?;
        let accounts: Vec<HarvestAccount> = parsed
            .accounts
            .into_iter()
            .filter(|a| {
                a.product
                    .as_deref()
                    .map(|p| p.eq_ignore_ascii_case(ApiConfig::HARVEST_PRODUCT))
                    .unwrap_or(true)
            })
            .collect();
        debug!("Token grants access to {} Harvest accounts", accounts.len());
        Ok(accounts)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<OAuthTokens> {
        let url = format!("{}/api/v2/oauth2/token", self.base_url);
        let response = self
            .http
            .execute(|client| client.post(&url).form(form))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MigrateError::OAuth {
                message: format!("Token request failed: {}", error_message(status, &body)),
            });
        }

        let parsed: TokenResponse = response.json().await?;
        Ok(parsed.stamp(chrono::Utc::now().timestamp()))
    }
}
