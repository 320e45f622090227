//! Harvest Migrate Core - Headless library for moving Harvest time entries
//! between accounts.
//!
//! This crate holds the mapping/migration engine and its collaborators: OAuth
//! credentials, the Harvest REST client, and the operator prompt seam. The
//! `harvest-migrate` binary wires them to a terminal.
//!
//! # Example
//!
//! ```rust,ignore
//! use harvest_migrate::{EntityMapper, MigrationRunner, RemapCoordinator, RemapScope};
//!
//! async fn migrate(
//!     source: Arc<HarvestClient>,
//!     destination: Arc<HarvestClient>,
//!     prompter: Arc<dyn Prompter>,
//!     user_id: u64,
//!     date: NaiveDate,
//! ) -> harvest_migrate::Result<()> {
//!     let mapper = EntityMapper::new(source.clone(), destination.clone(), prompter.clone());
//!     let mapping = mapper.create_mapping(user_id).await?;
//!     let entries = source.list_time_entries(date, Some(user_id)).await?;
//!
//!     let runner = MigrationRunner::new(
//!         prompter,
//!         RemapCoordinator::new(mapper, RemapScope::FailedProject),
//!     );
//!     let report = runner.run_migration(&entries, mapping, destination.as_ref()).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod harvest;
pub mod mapping;
pub mod migration;
pub mod network;
pub mod prompt;

// Re-export commonly used types
pub use auth::{BrowserAuthorizer, Credential, CredentialProvider, HarvestIdClient, TokenStore};
pub use config::{AccountRole, OAuthSettings};
pub use error::{MigrateError, Result};
pub use harvest::{
    CreateOutcome, EntityDirectory, HarvestClient, HarvestProject, HarvestUser, NewTimeEntry,
    TaskAssignment, TimeEntry, TimeEntrySink,
};
pub use mapping::{EntityMapper, EntityMapping, MigrationMapping, ProjectMapping, UserMapping};
pub use migration::{
    EntryOutcome, MigrationReport, MigrationRunner, RemapCoordinator, RemapScope, SkipReason,
};
pub use network::HttpClient;
pub use prompt::{Choice, Prompter, Selection};
