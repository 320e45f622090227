//! Directory and sink seams used by the mapping/migration engine.
//!
//! [`crate::harvest::HarvestClient`] implements both traits against the
//! Harvest API; tests substitute in-memory directories.

use crate::config::AccountRole;
use crate::error::Result;
use crate::harvest::types::{
    CreateOutcome, HarvestProject, HarvestUser, NewTimeEntry, TaskAssignment, TimeEntry,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Read access to the users, projects, and tasks of one account.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// The account side this directory reads from.
    fn role(&self) -> AccountRole;

    /// All users of the account, active or not.
    async fn list_users(&self) -> Result<Vec<HarvestUser>>;

    /// All projects of the account, in API order.
    async fn list_projects(&self) -> Result<Vec<HarvestProject>>;

    /// Task assignments of one project, in API order.
    async fn list_project_tasks(&self, project_id: u64) -> Result<Vec<TaskAssignment>>;

    /// Time entries spent on `date`, optionally restricted to one user.
    async fn list_time_entries(
        &self,
        date: NaiveDate,
        user_id: Option<u64>,
    ) -> Result<Vec<TimeEntry>>;
}

/// The destination-side operation that persists a translated time entry.
#[async_trait]
pub trait TimeEntrySink: Send + Sync {
    /// Create a time entry.
    ///
    /// Returns `Ok(CreateOutcome::Rejected)` when the referenced project or
    /// task does not exist; `Err` only for transport and auth failures.
    async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<CreateOutcome>;
}
