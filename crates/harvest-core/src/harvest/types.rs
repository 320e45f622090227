//! Records exchanged with the Harvest API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A `{ id, name }` reference embedded in other records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    pub name: String,
}

/// A person in a Harvest account, as returned by `GET /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestUser {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl HarvestUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Label used in selection prompts: `First Last (email)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.full_name(), self.email)
    }
}

/// A project, as returned by `GET /projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl HarvestProject {
    pub fn named_ref(&self) -> NamedRef {
        NamedRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// A task assigned to a project, from `GET /projects/{id}/task_assignments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task: NamedRef,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A Harvest account reachable with an access token, from the ID API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestAccount {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub product: Option<String>,
}

/// A time entry read from the source account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: u64,
    pub spent_date: NaiveDate,
    pub hours: f64,
    #[serde(default)]
    pub notes: Option<String>,
    pub project: NamedRef,
    pub task: NamedRef,
    pub user: NamedRef,
}

impl TimeEntry {
    /// One-line summary: `Project (Task): 2h - notes`.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {}h - {}",
            self.project.name,
            self.task.name,
            self.hours,
            self.notes.as_deref().filter(|n| !n.is_empty()).unwrap_or("No notes")
        )
    }
}

/// A translated time entry ready for the destination account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTimeEntry {
    pub user_id: u64,
    pub project_id: u64,
    pub task_id: u64,
    pub spent_date: NaiveDate,
    pub hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Structured result of creating a time entry.
///
/// "Not found" conditions come back as `Rejected`; transport failures are
/// errors instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { id: u64 },
    Rejected { error: String },
}

impl CreateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CreateOutcome::Created { .. })
    }
}

fn default_true() -> bool {
    true
}
