//! Account menu and migration wizard.

use chrono::NaiveDate;
use harvest_migrate::prompt::select_one;
use harvest_migrate::{
    AccountRole, Choice, CredentialProvider, EntityDirectory, EntityMapper, HarvestClient,
    HttpClient, MigrateError, MigrationRunner, Prompter, RemapCoordinator, RemapScope, Result,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Entries of the account menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MenuAction {
    Use(AccountRole),
    AddNew(AccountRole),
    Remove(AccountRole),
    Migrate,
    Exit,
}

impl MenuAction {
    fn label(&self) -> String {
        match self {
            MenuAction::Use(role) => format!("Use/configure {} account", role),
            MenuAction::AddNew(role) => format!("Add new {} account", role),
            MenuAction::Remove(role) => format!("Remove {} account", role),
            MenuAction::Migrate => "Perform migration".to_string(),
            MenuAction::Exit => "Exit".to_string(),
        }
    }
}

/// Menu entries available given which roles are configured.
pub(crate) fn menu_actions(
    source_configured: bool,
    destination_configured: bool,
) -> Vec<MenuAction> {
    let mut actions = Vec::new();
    for (role, configured) in [
        (AccountRole::Source, source_configured),
        (AccountRole::Destination, destination_configured),
    ] {
        actions.push(MenuAction::Use(role));
        actions.push(MenuAction::AddNew(role));
        if configured {
            actions.push(MenuAction::Remove(role));
        }
    }
    if source_configured && destination_configured {
        actions.push(MenuAction::Migrate);
    }
    actions.push(MenuAction::Exit);
    actions
}

pub(crate) fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// The interactive session.
pub struct Menu {
    credentials: Arc<CredentialProvider>,
    prompter: Arc<dyn Prompter>,
    http: HttpClient,
    scope: RemapScope,
}

impl Menu {
    pub fn new(
        credentials: Arc<CredentialProvider>,
        prompter: Arc<dyn Prompter>,
        http: HttpClient,
        scope: RemapScope,
    ) -> Self {
        Self {
            credentials,
            prompter,
            http,
            scope,
        }
    }

    /// Show the menu until the operator exits or input ends.
    pub async fn run(&self) -> Result<()> {
        loop {
            let source = self.credentials.account_info(AccountRole::Source);
            let destination = self.credentials.account_info(AccountRole::Destination);

            println!();
            println!("=== Harvest Time Migration ===");
            println!("Source:      {}", describe(&source));
            println!("Destination: {}", describe(&destination));

            let choices = menu_actions(source.is_some(), destination.is_some())
                .into_iter()
                .map(|a| Choice::new(a.label(), a))
                .collect();
            let action =
                select_one(self.prompter.as_ref(), "What would you like to do?", choices).await?;

            let result = match action {
                MenuAction::Use(role) => {
                    self.credentials.configure(role, false).await.map(|_| ())
                }
                MenuAction::AddNew(role) => {
                    self.credentials.configure(role, true).await.map(|_| ())
                }
                MenuAction::Remove(role) => self.credentials.clear(role),
                MenuAction::Migrate => self.perform_migration().await,
                MenuAction::Exit => {
                    info!("Goodbye");
                    return Ok(());
                }
            };

            match result {
                Err(MigrateError::PromptClosed) => return Err(MigrateError::PromptClosed),
                Err(e) => {
                    warn!("{:?} failed", action);
                    println!("Error: {}", e);
                }
                Ok(()) => {}
            }
        }
    }

    async fn perform_migration(&self) -> Result<()> {
        let source = Arc::new(HarvestClient::new(
            AccountRole::Source,
            self.credentials.clone(),
            self.http.clone(),
        ));
        let destination = Arc::new(HarvestClient::new(
            AccountRole::Destination,
            self.credentials.clone(),
            self.http.clone(),
        ));

        let users: Vec<_> = source
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.is_active)
            .collect();
        if users.is_empty() {
            println!("No active users found in the source account");
            return Ok(());
        }

        let choices = users.into_iter().map(|u| Choice::new(u.label(), u)).collect();
        let user = select_one(self.prompter.as_ref(), "Select the user to migrate", choices).await?;
        let date = self.ask_date().await?;

        let mapper = EntityMapper::new(source.clone(), destination.clone(), self.prompter.clone());
        let mapping = mapper.create_mapping(user.id).await?;

        let entries = source.list_time_entries(date, Some(user.id)).await?;
        if entries.is_empty() {
            println!("No time entries found for {} on {}", user.full_name(), date);
            return Ok(());
        }

        println!();
        println!("Time entries for {} on {}:", user.full_name(), date);
        for entry in &entries {
            println!("  - {}", entry.summary());
        }
        let proceed = self
            .prompter
            .confirm(
                &format!("Migrate these {} time entries?", entries.len()),
                false,
            )
            .await?;
        if !proceed {
            println!("Migration cancelled");
            return Ok(());
        }

        let runner = MigrationRunner::new(
            self.prompter.clone(),
            RemapCoordinator::new(mapper, self.scope),
        );
        let report = runner
            .run_migration(&entries, mapping, destination.as_ref())
            .await?;

        println!();
        println!("Migration report:");
        println!("{}", report);
        Ok(())
    }

    async fn ask_date(&self) -> Result<NaiveDate> {
        loop {
            let input = self.prompter.input("Enter the date to migrate (YYYY-MM-DD)").await?;
            match parse_date(&input) {
                Some(date) => return Ok(date),
                None => println!("Invalid date format, please use YYYY-MM-DD"),
            }
        }
    }
}

fn describe(account: &Option<(u64, String)>) -> String {
    match account {
        Some((id, name)) => format!("{} (ID: {})", name, id),
        None => "not configured".to_string(),
    }
}
