//! OAuth2 authorization against the Harvest ID service.
//!
//! - [`TokenStore`]: per-role tokens persisted as JSON
//! - [`HarvestIdClient`]: token exchange, refresh, and account listing
//! - [`Authorizer`]: the interactive browser step
//! - [`CredentialProvider`]: valid credentials on demand

mod authorizer;
mod id_client;
mod provider;
mod store;

pub use authorizer::{new_state, Authorizer, BrowserAuthorizer};
pub use id_client::HarvestIdClient;
pub use provider::{Credential, CredentialProvider};
pub use store::{OAuthTokens, StoredAccount, StoredTokens, TokenStore};
