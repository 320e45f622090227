//! Credential resolution per account role.
//!
//! Tokens are refreshed lazily, right before the request that needs them.
//! Refreshes are serialized so two concurrent callers never spend the same
//! refresh token twice.

use crate::auth::authorizer::{new_state, Authorizer};
use crate::auth::id_client::HarvestIdClient;
use crate::auth::store::{StoredAccount, TokenStore};
use crate::config::AccountRole;
use crate::prompt::{select_one, Choice, Prompter};
use crate::{MigrateError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Bearer token and account id for one authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub account_id: u64,
}

/// Hands out valid credentials for the source and destination accounts.
pub struct CredentialProvider {
    id_client: HarvestIdClient,
    store: TokenStore,
    authorizer: Arc<dyn Authorizer>,
    prompter: Arc<dyn Prompter>,
    refresh_lock: Mutex<()>,
}

impl CredentialProvider {
    pub fn new(
        id_client: HarvestIdClient,
        store: TokenStore,
        authorizer: Arc<dyn Authorizer>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            id_client,
            store,
            authorizer,
            prompter,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn id_client(&self) -> &HarvestIdClient {
        &self.id_client
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Return a usable credential for `role`, refreshing an expired token.
    ///
    /// A failed refresh removes the role's stored account; the operator has
    /// to configure it again.
    pub async fn get_credential(&self, role: AccountRole) -> Result<Credential> {
        let _guard = self.refresh_lock.lock().await;

        let account = self
            .store
            .account(role)
            .ok_or(MigrateError::NotConfigured { role })?;

        if account.tokens.is_valid() {
            return Ok(Credential {
                token: account.tokens.access_token,
                account_id: account.id,
            });
        }

        info!("Access token for the {} account expired", role);
        match self.id_client.refresh(&account.tokens).await {
            Ok(tokens) => {
                let refreshed = StoredAccount { tokens, ..account };
                self.store.update(role, Some(refreshed.clone()))?;
                Ok(Credential {
                    token: refreshed.tokens.access_token,
                    account_id: refreshed.id,
                })
            }
            Err(e) => {
                warn!("Token refresh for the {} account failed: {}", role, e);
                self.store.update(role, None)?;
                Err(e)
            }
        }
    }

    /// Make sure `role` has a usable account, authorizing when needed.
    ///
    /// With `fresh` the stored account is ignored and the operator goes
    /// through the browser flow again.
    pub async fn configure(&self, role: AccountRole, fresh: bool) -> Result<StoredAccount> {
        if !fresh && self.store.account(role).is_some() {
            match self.get_credential(role).await {
                Ok(_) => {
                    return self
                        .store
                        .account(role)
                        .ok_or(MigrateError::NotConfigured { role })
                }
                Err(e) => warn!("Stored {} account unusable, re-authorizing: {}", role, e),
            }
        }

        let state = new_state();
        let url = self.id_client.authorize_url(&state)?;
        let code = self.authorizer.authorize(&url, &state).await?;
        let tokens = self.id_client.exchange_code(&code).await?;

        let mut accounts = self.id_client.list_accounts(&tokens.access_token).await?;
        let chosen = match accounts.len() {
            0 => return Err(MigrateError::EmptyDestinationSet { entity: "account" }),
            1 => accounts.remove(0),
            _ => {
                let choices = accounts
                    .into_iter()
                    .map(|a| Choice::new(format!("{} (ID: {})", a.name, a.id), a))
                    .collect();
                select_one(
                    self.prompter.as_ref(),
                    &format!("Select the {} Harvest account", role),
                    choices,
                )
                .await?
            }
        };

        let account = StoredAccount {
            id: chosen.id,
            name: chosen.name,
            tokens,
        };
        self.store.update(role, Some(account.clone()))?;
        info!(
            "Configured {} account {} (ID: {})",
            role, account.name, account.id
        );
        Ok(account)
    }

    /// Forget the stored account of `role`.
    pub fn clear(&self, role: AccountRole) -> Result<()> {
        info!("Removing the {} account", role);
        self.store.update(role, None)
    }

    /// Id and name of the account stored for `role`, if any.
    pub fn account_info(&self, role: AccountRole) -> Option<(u64, String)> {
        self.store.account(role).map(|a| (a.id, a.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::OAuthTokens;
    use crate::config::OAuthSettings;
    use crate::network::{HttpClient, RetryConfig};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Form, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CodeAuthorizer;

    #[async_trait]
    impl Authorizer for CodeAuthorizer {
        async fn authorize(&self, authorize_url: &str, state: &str) -> Result<String> {
            assert!(authorize_url.contains(state));
            Ok("auth-code".to_string())
        }
    }

    struct PickSecond {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Prompter for PickSecond {
        async fn select(&self, _message: &str, labels: &[String]) -> Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(labels[1], "Acme Labs (ID: 2)");
            Ok(1)
        }

        async fn input(&self, _message: &str) -> Result<String> {
            Err(MigrateError::PromptClosed)
        }

        async fn confirm(&self, _message: &str, default: bool) -> Result<bool> {
            Ok(default)
        }
    }

    async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> axum::response::Response {
        let grant = form.get("grant_type").cloned().unwrap_or_default();
        match (grant.as_str(), form.get("refresh_token").map(String::as_str)) {
            ("refresh_token", Some("dead")) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_grant",
                    "error_description": "Refresh token revoked",
                })),
            )
                .into_response(),
            ("refresh_token", _) | ("authorization_code", _) => Json(json!({
                "access_token": format!("fresh-{}", grant),
                "refresh_token": "next-refresh",
                "token_type": "bearer",
                "expires_in": 1209600
            }))
            .into_response(),
            _ => StatusCode::BAD_REQUEST.into_response(),
        }
    }

    async fn accounts_endpoint() -> Json<serde_json::Value> {
        Json(json!({
            "accounts": [
                {"id": 1, "name": "Acme", "product": "harvest"},
                {"id": 2, "name": "Acme Labs", "product": "harvest"},
                {"id": 3, "name": "Acme Forecast", "product": "forecast"}
            ]
        }))
    }

    async fn spawn_id_server() -> String {
        let app = Router::new()
            .route("/api/v2/oauth2/token", post(token_endpoint))
            .route("/api/v2/accounts", get(accounts_endpoint));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn settings() -> OAuthSettings {
        OAuthSettings {
            client_id: "id".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:3000/oauth/callback".into(),
            scope: "all".into(),
        }
    }

    fn provider(base_url: &str, store: TokenStore) -> CredentialProvider {
        let http = HttpClient::new()
            .unwrap()
            .with_retry(RetryConfig::new().with_max_attempts(1));
        CredentialProvider::new(
            HarvestIdClient::with_base_url(http, settings(), base_url),
            store,
            Arc::new(CodeAuthorizer),
            Arc::new(PickSecond {
                calls: AtomicUsize::new(0),
            }),
        )
    }

    fn stored(id: u64, refresh_token: &str, created_at: i64) -> StoredAccount {
        StoredAccount {
            id,
            name: "Acme".into(),
            tokens: OAuthTokens {
                access_token: "stored-access".into(),
                refresh_token: refresh_token.into(),
                token_type: "bearer".into(),
                expires_in: 1_209_600,
                scope: None,
                created_at,
            },
        }
    }

    #[tokio::test]
    async fn test_missing_account_is_not_configured() {
        let temp = TempDir::new().unwrap();
        let provider = provider("http://127.0.0.1:9", TokenStore::new(temp.path().join("t.json")));

        let err = provider
            .get_credential(AccountRole::Source)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::NotConfigured {
                role: AccountRole::Source
            }
        ));
    }

    #[tokio::test]
    async fn test_valid_token_is_returned_without_refresh() {
        let temp = TempDir::new().unwrap();
        let store = TokenStore::new(temp.path().join("t.json"));
        let now = chrono::Utc::now().timestamp();
        store
            .update(AccountRole::Source, Some(stored(11, "r", now)))
            .unwrap();

        // Unreachable ID service: any refresh attempt would fail.
        let provider = provider("http://127.0.0.1:9", store);
        let credential = provider.get_credential(AccountRole::Source).await.unwrap();
        assert_eq!(
            credential,
            Credential {
                token: "stored-access".into(),
                account_id: 11
            }
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let base = spawn_id_server().await;
        let temp = TempDir::new().unwrap();
        let store = TokenStore::new(temp.path().join("t.json"));
        store
            .update(AccountRole::Destination, Some(stored(22, "r", 0)))
            .unwrap();

        let provider = provider(&base, store.clone());
        let credential = provider
            .get_credential(AccountRole::Destination)
            .await
            .unwrap();
        assert_eq!(credential.token, "fresh-refresh_token");
        assert_eq!(credential.account_id, 22);

        let persisted = store.account(AccountRole::Destination).unwrap();
        assert_eq!(persisted.tokens.refresh_token, "next-refresh");
        assert!(persisted.tokens.is_valid());
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_role() {
        let base = spawn_id_server().await;
        let temp = TempDir::new().unwrap();
        let store = TokenStore::new(temp.path().join("t.json"));
        store
            .update(AccountRole::Source, Some(stored(11, "dead", 0)))
            .unwrap();
        store
            .update(AccountRole::Destination, Some(stored(22, "r", 0)))
            .unwrap();

        let provider = provider(&base, store.clone());
        let err = provider
            .get_credential(AccountRole::Source)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::OAuth { .. }));
        assert!(store.account(AccountRole::Source).is_none());
        assert!(store.account(AccountRole::Destination).is_some());
    }

    #[tokio::test]
    async fn test_configure_runs_authorization_and_selects_account() {
        let base = spawn_id_server().await;
        let temp = TempDir::new().unwrap();
        let store = TokenStore::new(temp.path().join("t.json"));

        let provider = provider(&base, store.clone());
        let account = provider
            .configure(AccountRole::Source, false)
            .await
            .unwrap();

        assert_eq!(account.id, 2);
        assert_eq!(account.name, "Acme Labs");
        assert_eq!(account.tokens.access_token, "fresh-authorization_code");
        assert_eq!(
            provider.account_info(AccountRole::Source),
            Some((2, "Acme Labs".to_string()))
        );

        provider.clear(AccountRole::Source).unwrap();
        assert_eq!(provider.account_info(AccountRole::Source), None);
    }

    #[tokio::test]
    async fn test_configure_keeps_usable_account() {
        let temp = TempDir::new().unwrap();
        let store = TokenStore::new(temp.path().join("t.json"));
        let now = chrono::Utc::now().timestamp();
        store
            .update(AccountRole::Source, Some(stored(11, "r", now)))
            .unwrap();

        let provider = provider("http://127.0.0.1:9", store);
        let account = provider
            .configure(AccountRole::Source, false)
            .await
            .unwrap();
        assert_eq!(account.id, 11);
    }
}
