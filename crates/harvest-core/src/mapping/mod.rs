//! Source-to-destination entity mapping.

mod mapper;
mod types;

pub use mapper::{EntityMapper, SKIP_PROJECT_LABEL, SKIP_TASK_LABEL};
pub use types::{EntityMapping, MigrationMapping, ProjectMapping, UserMapping};
