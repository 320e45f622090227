//! Per-run correspondences between source and destination entities.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Deref;

/// One source-to-destination correspondence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub source_id: u64,
    pub destination_id: u64,
    /// Source-side display name.
    pub name: String,
}

impl EntityMapping {
    pub fn new(source_id: u64, destination_id: u64, name: impl Into<String>) -> Self {
        Self {
            source_id,
            destination_id,
            name: name.into(),
        }
    }
}

/// Mapping of the migrated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMapping(pub EntityMapping);

impl Deref for UserMapping {
    type Target = EntityMapping;

    fn deref(&self) -> &EntityMapping {
        &self.0
    }
}

/// Mapping of one project and of the tasks chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMapping {
    #[serde(flatten)]
    pub mapping: EntityMapping,
    /// Source task id -> destination task id. Skipped tasks are absent.
    #[serde(default)]
    pub tasks: HashMap<u64, u64>,
}

impl ProjectMapping {
    pub fn new(mapping: EntityMapping) -> Self {
        Self {
            mapping,
            tasks: HashMap::new(),
        }
    }

    pub fn destination_task(&self, source_task_id: u64) -> Option<u64> {
        self.tasks.get(&source_task_id).copied()
    }
}

impl Deref for ProjectMapping {
    type Target = EntityMapping;

    fn deref(&self) -> &EntityMapping {
        &self.mapping
    }
}

/// Everything needed to translate one user's time entries.
///
/// Rebuilt every run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationMapping {
    pub user: UserMapping,
    /// Keyed by source project id. Skipped projects are absent.
    pub projects: HashMap<u64, ProjectMapping>,
}

impl MigrationMapping {
    pub fn project(&self, source_project_id: u64) -> Option<&ProjectMapping> {
        self.projects.get(&source_project_id)
    }

    /// Copy of this mapping with the entry for `project.source_id` replaced
    /// by `project`.
    pub fn with_project(&self, project: ProjectMapping) -> MigrationMapping {
        let mut next = self.clone();
        next.projects.insert(project.source_id, project);
        next
    }
}
