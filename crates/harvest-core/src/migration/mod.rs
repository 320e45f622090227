//! Time entry migration: the per-entry runner, remapping, and reporting.

mod remap;
mod report;
mod runner;

pub use remap::{RemapCoordinator, RemapScope};
pub use report::{EntryOutcome, EntryReport, MigrationReport, SkipReason};
pub use runner::{translate_entry, EntryState, FailureDecision, MigrationRunner};
