//! Re-mapping after the destination rejects an entry.

use crate::harvest::TimeEntry;
use crate::mapping::{EntityMapper, MigrationMapping};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which projects the operator is asked about during a remap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemapScope {
    /// Only the project of the failed entry.
    #[default]
    FailedProject,
    /// Every source project again; only the failed project's answer is kept.
    AllProjects,
}

/// Replaces the failed entry's project mapping with a fresh one.
#[derive(Clone)]
pub struct RemapCoordinator {
    mapper: EntityMapper,
    scope: RemapScope,
}

impl RemapCoordinator {
    pub fn new(mapper: EntityMapper, scope: RemapScope) -> Self {
        Self { mapper, scope }
    }

    pub fn scope(&self) -> RemapScope {
        self.scope
    }

    /// Return a copy of `current` whose mapping for the failed entry's
    /// project is rebuilt; every other project mapping is carried over.
    ///
    /// Skipping the project during the remap keeps its current mapping.
    pub async fn remap_failed_entry(
        &self,
        current: &MigrationMapping,
        failed_entry: &TimeEntry,
    ) -> Result<MigrationMapping> {
        let project_id = failed_entry.project.id;
        info!(
            "Remapping project {} ({}) for time entry {}",
            project_id, failed_entry.project.name, failed_entry.id
        );

        let fresh = match self.scope {
            RemapScope::FailedProject => {
                let destination_projects = self.mapper.destination().list_projects().await?;
                self.mapper
                    .map_project(&failed_entry.project, &destination_projects)
                    .await?
            }
            RemapScope::AllProjects => self.mapper.map_projects().await?.remove(&project_id),
        };

        let Some(project) = fresh else {
            info!(
                "Time entry {}: project {} skipped during remap, keeping its current mapping",
                failed_entry.id, project_id
            );
            return Ok(current.clone());
        };

        info!(
            "Time entry {}: project {} now maps to destination project {} ({} tasks)",
            failed_entry.id,
            project_id,
            project.destination_id,
            project.tasks.len()
        );
        Ok(current.with_project(project))
    }
}
