//! Harvest Migrate - interactive CLI for moving time entries between Harvest
//! accounts.
//!
//! This binary wires the `harvest_migrate` library to a terminal: OAuth
//! settings come from the environment (or `.env`), tokens live in a per-user
//! store, and every mapping decision is asked on stdin.

mod menu;
mod prompter;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use harvest_migrate::config::token_store_path;
use harvest_migrate::{
    BrowserAuthorizer, CredentialProvider, HarvestIdClient, HttpClient, MigrateError,
    OAuthSettings, Prompter, RemapScope, TokenStore,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "harvest-migrate")]
#[command(about = "Migrate time entries between Harvest accounts")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configure accounts and migrate time entries interactively
    Migrate(MigrateArgs),
}

#[derive(clap::Args, Debug)]
struct MigrateArgs {
    /// Token store file (defaults to HARVEST_TOKEN_STORE, then the config dir)
    #[arg(long)]
    token_store: Option<PathBuf>,

    /// Which projects to re-map after the destination rejects an entry
    #[arg(long, value_enum, default_value_t = ScopeArg::FailedProject)]
    remap_scope: ScopeArg,

    /// Print the authorization URL instead of opening a browser
    #[arg(long)]
    no_browser: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ScopeArg {
    FailedProject,
    AllProjects,
}

impl From<ScopeArg> for RemapScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::FailedProject => RemapScope::FailedProject,
            ScopeArg::AllProjects => RemapScope::AllProjects,
        }
    }
}

fn init_logging(debug: bool) {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let settings = OAuthSettings::from_env()?;
    let store = TokenStore::new(token_store_path(args.token_store)?);
    info!("Token store: {}", store.path().display());

    let http = HttpClient::new()?;
    let prompter: Arc<dyn Prompter> = Arc::new(prompter::TerminalPrompter::new());

    let mut authorizer = BrowserAuthorizer::new(settings.redirect_uri.clone());
    if args.no_browser {
        authorizer = authorizer.without_browser();
    }

    let credentials = Arc::new(CredentialProvider::new(
        HarvestIdClient::new(http.clone(), settings),
        store,
        Arc::new(authorizer),
        prompter.clone(),
    ));

    menu::Menu::new(credentials, prompter, http, args.remap_scope.into())
        .run()
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    let result = match args.command {
        Command::Migrate(migrate_args) => run_migrate(migrate_args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<MigrateError>()
                .map(MigrateError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
