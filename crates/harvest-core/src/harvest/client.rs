//! Harvest REST API v2 client.
//!
//! One client per account role. Credentials are resolved through the shared
//! [`CredentialProvider`] right before each request, so a token that expires
//! mid-run is refreshed transparently.

use crate::auth::{Credential, CredentialProvider};
use crate::config::{AccountRole, ApiConfig};
use crate::harvest::directory::{EntityDirectory, TimeEntrySink};
use crate::harvest::types::{
    CreateOutcome, HarvestProject, HarvestUser, NewTimeEntry, TaskAssignment, TimeEntry,
};
use crate::network::{error_message, HttpClient};
use crate::{MigrateError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

const ACCOUNT_ID_HEADER: &str = "Harvest-Account-ID";

#[derive(Debug, Deserialize)]
struct CreatedEntry {
    id: u64,
}

/// Harvest API client bound to one account role.
#[derive(Clone)]
pub struct HarvestClient {
    role: AccountRole,
    credentials: Arc<CredentialProvider>,
    http: HttpClient,
    base_url: String,
}

impl HarvestClient {
    pub fn new(
        role: AccountRole,
        credentials: Arc<CredentialProvider>,
        http: HttpClient,
    ) -> Self {
        Self::with_base_url(role, credentials, http, ApiConfig::API_BASE)
    }

    /// Target a different API base URL (used by tests).
    pub fn with_base_url(
        role: AccountRole,
        credentials: Arc<CredentialProvider>,
        http: HttpClient,
        base_url: &str,
    ) -> Self {
        Self {
            role,
            credentials,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send an authenticated request for this client's account.
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let Credential { token, account_id } = self.credentials.get_credential(self.role).await?;
        let account_id = account_id.to_string();

        self.http
            .execute(|client| {
                build(client)
                    .bearer_auth(&token)
                    .header(ACCOUNT_ID_HEADER, &account_id)
            })
            .await
    }

    /// Map auth failures and other error statuses to errors.
    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(MigrateError::Unauthorized {
                role: self.role,
                message,
            }),
            _ => Err(MigrateError::Api {
                message,
                status_code: Some(status.as_u16()),
            }),
        }
    }

    /// Collect every page of a list endpoint.
    ///
    /// Harvest wraps each page as `{ "<key>": [...], "next_page": n|null }`.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.url(path);
        let mut items = Vec::new();
        let mut page: u64 = 1;

        loop {
            let per_page = ApiConfig::PER_PAGE.to_string();
            let page_param = page.to_string();
            let response = self
                .send(|client| {
                    client
                        .get(&url)
                        .query(query)
                        .query(&[("page", &page_param), ("per_page", &per_page)])
                })
                .await?;
            let response = self.check_status(response).await?;

            let mut body: serde_json::Value = response.json().await?;
            let batch: Vec<T> = match body.get_mut(key) {
                Some(value) => serde_json::from_value(value.take())?,
                None => {
                    return Err(MigrateError::Api {
                        message: format!("Response from {} has no '{}' field", path, key),
                        status_code: None,
                    })
                }
            };
            items.extend(batch);

            match body.get("next_page").and_then(|v| v.as_u64()) {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        debug!(
            "Fetched {} {} from the {} account",
            items.len(),
            key,
            self.role
        );
        Ok(items)
    }

    /// Fetch one project; `None` when it does not exist.
    pub async fn get_project(&self, project_id: u64) -> Result<Option<HarvestProject>> {
        let url = self.url(&format!("/projects/{}", project_id));
        let response = self.send(|client| client.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.check_status(response).await?;
        Ok(Some(response.json().await?))
    }
}

#[async_trait]
impl EntityDirectory for HarvestClient {
    fn role(&self) -> AccountRole {
        self.role
    }

    async fn list_users(&self) -> Result<Vec<HarvestUser>> {
        self.list_all("/users", "users", &[]).await
    }

    async fn list_projects(&self) -> Result<Vec<HarvestProject>> {
        self.list_all("/projects", "projects", &[]).await
    }

    async fn list_project_tasks(&self, project_id: u64) -> Result<Vec<TaskAssignment>> {
        self.list_all(
            &format!("/projects/{}/task_assignments", project_id),
            "task_assignments",
            &[],
        )
        .await
    }

    async fn list_time_entries(
        &self,
        date: NaiveDate,
        user_id: Option<u64>,
    ) -> Result<Vec<TimeEntry>> {
        let day = date.format("%Y-%m-%d").to_string();
        let mut query = vec![("from", day.clone()), ("to", day)];
        if let Some(user_id) = user_id {
            query.push(("user_id", user_id.to_string()));
        }
        self.list_all("/time_entries", "time_entries", &query).await
    }
}

#[async_trait]
impl TimeEntrySink for HarvestClient {
    async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<CreateOutcome> {
        if self.get_project(entry.project_id).await?.is_none() {
            return Ok(CreateOutcome::Rejected {
                error: format!(
                    "Project {} not found in {} account",
                    entry.project_id, self.role
                ),
            });
        }

        let assignments = self.list_project_tasks(entry.project_id).await?;
        if !assignments.iter().any(|a| a.task.id == entry.task_id) {
            return Ok(CreateOutcome::Rejected {
                error: format!(
                    "Task {} is not assigned to project {}",
                    entry.task_id, entry.project_id
                ),
            });
        }

        let url = self.url("/time_entries");
        let response = self.send(|client| client.post(&url).json(entry)).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            return Ok(CreateOutcome::Rejected {
                error: error_message(status, &body),
            });
        }

        let response = self.check_status(response).await?;
        let created: CreatedEntry = response.json().await?;
        info!(
            "Created time entry {} in project {} (task {})",
            created.id, entry.project_id, entry.task_id
        );
        Ok(CreateOutcome::Created { id: created.id })
    }
}
