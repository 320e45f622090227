//! Interactive OAuth authorization: browser hand-off plus a one-shot local
//! callback listener that receives the authorization code.

use crate::config::AuthConfig;
use crate::{MigrateError, Result};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Obtains an authorization code from the operator.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Send the operator to `authorize_url` and wait for the redirect that
    /// carries `state` back.
    async fn authorize(&self, authorize_url: &str, state: &str) -> Result<String>;
}

/// Generate the random `state` parameter for one authorization attempt.
pub fn new_state() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<Result<String>>>>>;

#[derive(Clone)]
struct CallbackState {
    expected_state: String,
    sender: CallbackSender,
}

/// Opens the system browser and listens on the redirect URI.
#[derive(Debug, Clone)]
pub struct BrowserAuthorizer {
    redirect_uri: String,
    open_browser: bool,
    timeout: Duration,
}

impl BrowserAuthorizer {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            open_browser: true,
            timeout: AuthConfig::CALLBACK_TIMEOUT,
        }
    }

    /// Only print the URL instead of launching a browser.
    pub fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn callback_endpoint(&self) -> Result<(String, u16, String)> {
        let url = url::Url::parse(&self.redirect_uri).map_err(|e| MigrateError::Config {
            message: format!("Invalid redirect URI {}: {}", self.redirect_uri, e),
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| MigrateError::Config {
                message: format!("Redirect URI {} has no host", self.redirect_uri),
            })?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);
        Ok((host, port, url.path().to_string()))
    }
}

#[async_trait]
impl Authorizer for BrowserAuthorizer {
    async fn authorize(&self, authorize_url: &str, state: &str) -> Result<String> {
        let (host, port, path) = self.callback_endpoint()?;

        let listener = tokio::net::TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|e| MigrateError::OAuth {
                message: format!(
                    "Cannot listen for the OAuth callback on {}:{}: {}",
                    host, port, e
                ),
            })?;
        debug!("OAuth callback listener on {}", listener.local_addr()?);

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = Router::new()
            .route(&path, get(handle_callback))
            .with_state(CallbackState {
                expected_state: state.to_string(),
                sender: Arc::new(Mutex::new(Some(code_tx))),
            });

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!("OAuth callback server error: {}", e);
            }
        });

        info!("Authorize this tool in your browser. If it does not open, visit:");
        info!("{}", authorize_url);
        if self.open_browser {
            if let Err(e) = open_in_browser(authorize_url) {
                warn!("Could not open a browser: {}", e);
            }
        }

        let outcome = tokio::time::timeout(self.timeout, code_rx).await;
        let _ = shutdown_tx.send(());
        let _ = server.await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(MigrateError::OAuth {
                message: "OAuth callback listener stopped unexpectedly".to_string(),
            }),
            Err(_) => Err(MigrateError::OAuth {
                message: format!("No OAuth callback received within {:?}", self.timeout),
            }),
        }
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> &'static str {
    let (result, page) = match (params.error, params.state, params.code) {
        (Some(error), _, _) => (
            Err(MigrateError::OAuth {
                message: format!("Authentication failed: {}", error),
            }),
            "Authentication failed. You can close this window.",
        ),
        (None, returned, _) if returned.as_deref() != Some(state.expected_state.as_str()) => (
            Err(MigrateError::OAuth {
                message: "Invalid state parameter".to_string(),
            }),
            "Invalid state parameter.",
        ),
        (None, _, Some(code)) => (
            Ok(code),
            "Authentication successful! You can close this window.",
        ),
        (None, _, None) => (
            Err(MigrateError::OAuth {
                message: "Callback did not include an authorization code".to_string(),
            }),
            "Authentication failed: missing code.",
        ),
    };

    let sender = match state.sender.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(sender) = sender {
        let _ = sender.send(result);
    }
    page
}

/// Open a URL in the default system browser.
fn open_in_browser(url: &str) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(MigrateError::Validation {
            field: "url".to_string(),
            message: "Only http/https URLs are allowed".to_string(),
        });
    }

    #[cfg(target_os = "linux")]
    let mut command = Command::new("xdg-open");
    #[cfg(target_os = "macos")]
    let mut command = Command::new("open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return Err(MigrateError::Other(
        "Opening a browser is not supported on this platform".to_string(),
    ));

    #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
    {
        command
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}
