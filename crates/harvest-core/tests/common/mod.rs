//! Shared in-memory doubles for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use harvest_migrate::harvest::NamedRef;
use harvest_migrate::{
    AccountRole, CreateOutcome, EntityDirectory, HarvestProject, HarvestUser, MigrateError,
    NewTimeEntry, Prompter, Result, TaskAssignment, TimeEntry, TimeEntrySink,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub fn user(id: u64, first: &str, last: &str, active: bool) -> HarvestUser {
    HarvestUser {
        id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}@example.com", first.to_lowercase()),
        is_active: active,
    }
}

pub fn project(id: u64, name: &str) -> HarvestProject {
    HarvestProject {
        id,
        name: name.to_string(),
        code: None,
        is_active: true,
    }
}

pub fn assignment(task_id: u64, name: &str) -> TaskAssignment {
    TaskAssignment {
        task: NamedRef {
            id: task_id,
            name: name.to_string(),
        },
        is_active: true,
    }
}

pub fn time_entry(id: u64, project_id: u64, task_id: u64, hours: f64) -> TimeEntry {
    TimeEntry {
        id,
        spent_date: date(),
        hours,
        notes: Some(format!("Work item {}", id)),
        project: NamedRef {
            id: project_id,
            name: format!("Project {}", project_id),
        },
        task: NamedRef {
            id: task_id,
            name: format!("Task {}", task_id),
        },
        user: NamedRef {
            id: 1,
            name: "Kim Allen".to_string(),
        },
    }
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

/// Directory backed by vectors, recording which listings were requested.
#[derive(Default)]
pub struct FakeDirectory {
    pub role: Option<AccountRole>,
    pub users: Vec<HarvestUser>,
    pub projects: Vec<HarvestProject>,
    pub tasks: HashMap<u64, Vec<TaskAssignment>>,
    pub entries: Vec<TimeEntry>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeDirectory {
    pub fn new(role: AccountRole) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn with_users(mut self, users: Vec<HarvestUser>) -> Self {
        self.users = users;
        self
    }

    pub fn with_projects(mut self, projects: Vec<HarvestProject>) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_tasks(mut self, project_id: u64, tasks: Vec<TaskAssignment>) -> Self {
        self.tasks.insert(project_id, tasks);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EntityDirectory for FakeDirectory {
    fn role(&self) -> AccountRole {
        self.role.unwrap_or(AccountRole::Source)
    }

    async fn list_users(&self) -> Result<Vec<HarvestUser>> {
        self.record("users".to_string());
        Ok(self.users.clone())
    }

    async fn list_projects(&self) -> Result<Vec<HarvestProject>> {
        self.record("projects".to_string());
        Ok(self.projects.clone())
    }

    async fn list_project_tasks(&self, project_id: u64) -> Result<Vec<TaskAssignment>> {
        self.record(format!("tasks:{}", project_id));
        Ok(self.tasks.get(&project_id).cloned().unwrap_or_default())
    }

    async fn list_time_entries(
        &self,
        date: NaiveDate,
        user_id: Option<u64>,
    ) -> Result<Vec<TimeEntry>> {
        self.record(format!("entries:{}", date));
        Ok(self
            .entries
            .iter()
            .filter(|e| e.spent_date == date && user_id.map_or(true, |u| e.user.id == u))
            .cloned()
            .collect())
    }
}

/// Scripted sink outcome.
pub enum SinkReply {
    Created(u64),
    Rejected(&'static str),
    Fail,
}

/// Sink that records every submission and answers from a script.
///
/// When the script runs out every submission is accepted.
#[derive(Default)]
pub struct RecordingSink {
    replies: Mutex<VecDeque<SinkReply>>,
    pub submitted: Mutex<Vec<NewTimeEntry>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(replies: Vec<SinkReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> Vec<NewTimeEntry> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimeEntrySink for RecordingSink {
    async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<CreateOutcome> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(entry.clone());
        let next_id = 9000 + submitted.len() as u64;

        match self.replies.lock().unwrap().pop_front() {
            None => Ok(CreateOutcome::Created { id: next_id }),
            Some(SinkReply::Created(id)) => Ok(CreateOutcome::Created { id }),
            Some(SinkReply::Rejected(error)) => Ok(CreateOutcome::Rejected {
                error: error.to_string(),
            }),
            Some(SinkReply::Fail) => Err(MigrateError::Api {
                message: "Internal Server Error".to_string(),
                status_code: Some(500),
            }),
        }
    }
}

/// Prompter answering selections from a queue of indices.
///
/// Running out of answers behaves like a closed terminal.
#[derive(Default)]
pub struct ScriptedPrompter {
    selections: Mutex<VecDeque<usize>>,
    pub asked: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedPrompter {
    pub fn new(selections: Vec<usize>) -> Self {
        Self {
            selections: Mutex::new(selections.into()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<(String, Vec<String>)> {
        self.asked.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.selections.lock().unwrap().len()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn select(&self, message: &str, labels: &[String]) -> Result<usize> {
        self.asked
            .lock()
            .unwrap()
            .push((message.to_string(), labels.to_vec()));
        self.selections
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(MigrateError::PromptClosed)
    }

    async fn input(&self, _message: &str) -> Result<String> {
        Err(MigrateError::PromptClosed)
    }

    async fn confirm(&self, _message: &str, default: bool) -> Result<bool> {
        Ok(default)
    }
}
