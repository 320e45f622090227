//! Operator-driven construction of a [`MigrationMapping`].

use crate::harvest::{EntityDirectory, HarvestProject, NamedRef};
use crate::mapping::types::{EntityMapping, MigrationMapping, ProjectMapping, UserMapping};
use crate::prompt::{select_one, select_or_skip, Choice, Prompter, Selection};
use crate::{MigrateError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Label of the trailing entry that leaves a project unmapped.
pub const SKIP_PROJECT_LABEL: &str = "Skip this project";

/// Label of the trailing entry that leaves a task unmapped.
pub const SKIP_TASK_LABEL: &str = "Skip this task";

/// Builds mappings by listing both accounts and asking the operator.
///
/// Directory failures propagate unchanged; nothing is retried here.
#[derive(Clone)]
pub struct EntityMapper {
    source: Arc<dyn EntityDirectory>,
    destination: Arc<dyn EntityDirectory>,
    prompter: Arc<dyn Prompter>,
}

impl EntityMapper {
    pub fn new(
        source: Arc<dyn EntityDirectory>,
        destination: Arc<dyn EntityDirectory>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            source,
            destination,
            prompter,
        }
    }

    /// Build the full mapping for one source user.
    pub async fn create_mapping(&self, source_user_id: u64) -> Result<MigrationMapping> {
        let user = self.map_user(source_user_id).await?;
        let projects = self.map_projects().await?;

        info!(
            "Mapping ready: user {} -> {}, {} projects mapped",
            user.source_id,
            user.destination_id,
            projects.len()
        );
        Ok(MigrationMapping { user, projects })
    }

    /// Pair the source user with an active destination user.
    pub async fn map_user(&self, source_user_id: u64) -> Result<UserMapping> {
        let source_user = self
            .source
            .list_users()
            .await?
            .into_iter()
            .find(|u| u.id == source_user_id)
            .ok_or(MigrateError::EntityNotFound {
                entity: "user",
                id: source_user_id,
            })?;

        let choices: Vec<Choice<u64>> = self
            .destination
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.is_active)
            .map(|u| Choice::new(u.label(), u.id))
            .collect();
        if choices.is_empty() {
            return Err(MigrateError::EmptyDestinationSet { entity: "user" });
        }

        let name = source_user.full_name();
        let destination_id = select_one(
            self.prompter.as_ref(),
            &format!("Select the destination user for {}", name),
            choices,
        )
        .await?;

        debug!("User {} ({}) -> {}", source_user.id, name, destination_id);
        Ok(UserMapping(EntityMapping::new(
            source_user.id,
            destination_id,
            name,
        )))
    }

    /// Offer every source project in turn; skipped projects are left out.
    pub async fn map_projects(&self) -> Result<HashMap<u64, ProjectMapping>> {
        let source_projects = self.source.list_projects().await?;
        let destination_projects = self.destination.list_projects().await?;

        let mut projects = HashMap::new();
        for project in &source_projects {
            if let Some(mapping) = self
                .map_project(&project.named_ref(), &destination_projects)
                .await?
            {
                projects.insert(project.id, mapping);
            }
        }
        Ok(projects)
    }

    /// Map one source project and, unless skipped, its tasks.
    pub async fn map_project(
        &self,
        source_project: &NamedRef,
        destination_projects: &[HarvestProject],
    ) -> Result<Option<ProjectMapping>> {
        let choices = destination_projects
            .iter()
            .map(|p| Choice::new(p.name.clone(), p.id))
            .collect();

        let selection = select_or_skip(
            self.prompter.as_ref(),
            &format!("Map project '{}' to:", source_project.name),
            choices,
            SKIP_PROJECT_LABEL,
        )
        .await?;

        let destination_id = match selection {
            Selection::Chosen(id) => id,
            Selection::Skip => {
                info!(
                    "Skipping project {} ({})",
                    source_project.id, source_project.name
                );
                return Ok(None);
            }
        };

        let tasks = self
            .map_project_tasks(source_project.id, destination_id)
            .await?;
        debug!(
            "Project {} -> {} with {} tasks",
            source_project.id,
            destination_id,
            tasks.len()
        );

        Ok(Some(ProjectMapping {
            mapping: EntityMapping::new(
                source_project.id,
                destination_id,
                source_project.name.clone(),
            ),
            tasks,
        }))
    }

    /// Pair each task of the source project with one of the destination's.
    pub async fn map_project_tasks(
        &self,
        source_project_id: u64,
        destination_project_id: u64,
    ) -> Result<HashMap<u64, u64>> {
        let source_tasks = self.source.list_project_tasks(source_project_id).await?;
        let destination_tasks = self
            .destination
            .list_project_tasks(destination_project_id)
            .await?;

        let mut tasks = HashMap::new();
        for assignment in &source_tasks {
            let choices = destination_tasks
                .iter()
                .map(|d| Choice::new(d.task.name.clone(), d.task.id))
                .collect();

            let selection = select_or_skip(
                self.prompter.as_ref(),
                &format!("Map task '{}' to:", assignment.task.name),
                choices,
                SKIP_TASK_LABEL,
            )
            .await?;

            match selection {
                Selection::Chosen(id) => {
                    tasks.insert(assignment.task.id, id);
                }
                Selection::Skip => info!(
                    "Skipping task {} ({}) of project {}",
                    assignment.task.id, assignment.task.name, source_project_id
                ),
            }
        }
        Ok(tasks)
    }

    pub(crate) fn destination(&self) -> &Arc<dyn EntityDirectory> {
        &self.destination
    }
}
