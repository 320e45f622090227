//! Per-entry migration state machine.
//!
//! Each entry moves through the states below until it reaches a terminal
//! one. A rejected submission hands control to the operator, who can remap
//! and retry as many times as needed.
//!
//! ```text
//! Pending -> Resolving -> Submitting -> Succeeded
//!               |             |
//!               v             v
//!            Skipped   AwaitingDecision -> Skipped | Aborted
//!                             |
//!                             v
//!                         Remapping -> Pending
//! ```

use crate::harvest::{CreateOutcome, NewTimeEntry, TimeEntry, TimeEntrySink};
use crate::mapping::MigrationMapping;
use crate::migration::remap::RemapCoordinator;
use crate::migration::report::{EntryOutcome, EntryReport, MigrationReport, SkipReason};
use crate::prompt::{select_one, Choice, Prompter};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where an entry is in its migration.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    Pending,
    Resolving,
    Submitting(NewTimeEntry),
    Succeeded { created_id: u64 },
    AwaitingDecision { error: String },
    Remapping,
    Skipped(SkipReason),
    Aborted { error: String },
}

impl EntryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EntryState::Succeeded { .. } | EntryState::Skipped(_) | EntryState::Aborted { .. }
        )
    }
}

/// Operator answer after the destination rejected an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    Remap,
    Skip,
    Abort,
}

impl FailureDecision {
    pub const ALL: [FailureDecision; 3] = [
        FailureDecision::Remap,
        FailureDecision::Skip,
        FailureDecision::Abort,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FailureDecision::Remap => "Remap entities and retry",
            FailureDecision::Skip => "Skip this entry",
            FailureDecision::Abort => "Quit migration",
        }
    }
}

/// Translate `entry` through `mapping`, or say which lookup failed.
pub fn translate_entry(
    entry: &TimeEntry,
    mapping: &MigrationMapping,
) -> std::result::Result<NewTimeEntry, SkipReason> {
    let project = mapping
        .project(entry.project.id)
        .ok_or(SkipReason::UnmappedProject)?;
    let task_id = project
        .destination_task(entry.task.id)
        .ok_or(SkipReason::UnmappedTask)?;

    Ok(NewTimeEntry {
        user_id: mapping.user.destination_id,
        project_id: project.destination_id,
        task_id,
        spent_date: entry.spent_date,
        hours: entry.hours,
        notes: entry.notes.clone(),
    })
}

/// Migrates a batch of time entries one at a time.
pub struct MigrationRunner {
    prompter: Arc<dyn Prompter>,
    remap: RemapCoordinator,
}

impl MigrationRunner {
    pub fn new(prompter: Arc<dyn Prompter>, remap: RemapCoordinator) -> Self {
        Self { prompter, remap }
    }

    /// Migrate `entries` in order.
    ///
    /// Business-rule failures are settled per entry; transport and auth
    /// errors from the sink stop the run and are returned as `Err`. Nothing
    /// already written to the destination is rolled back.
    pub async fn run_migration(
        &self,
        entries: &[TimeEntry],
        mapping: MigrationMapping,
        sink: &dyn TimeEntrySink,
    ) -> Result<MigrationReport> {
        let mut mapping = mapping;
        let mut report = MigrationReport::default();

        info!("Migrating {} time entries", entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let (outcome, attempts) = self.migrate_entry(entry, &mut mapping, sink).await?;
            let aborted = matches!(outcome, EntryOutcome::Aborted { .. });

            report.entries.push(EntryReport {
                entry_id: entry.id,
                summary: entry.summary(),
                outcome,
                attempts,
            });

            if aborted {
                report.aborted = true;
                report.untouched = entries.len() - index - 1;
                warn!(
                    "Migration aborted at time entry {}; {} entries left untouched",
                    entry.id, report.untouched
                );
                break;
            }
        }

        info!(
            "Migration finished: {} migrated, {} skipped",
            report.succeeded(),
            report.skipped()
        );
        Ok(report)
    }

    async fn migrate_entry(
        &self,
        entry: &TimeEntry,
        mapping: &mut MigrationMapping,
        sink: &dyn TimeEntrySink,
    ) -> Result<(EntryOutcome, u32)> {
        let mut state = EntryState::Pending;
        let mut attempts = 0u32;

        loop {
            debug!("Time entry {}: {:?}", entry.id, state);
            state = match state {
                EntryState::Pending => EntryState::Resolving,

                EntryState::Resolving => match translate_entry(entry, mapping) {
                    Ok(new_entry) => EntryState::Submitting(new_entry),
                    Err(reason) => {
                        match reason {
                            SkipReason::UnmappedProject => warn!(
                                "No mapping found for project {} ({}), skipping time entry {}",
                                entry.project.name, entry.project.id, entry.id
                            ),
                            _ => warn!(
                                "No mapping found for task {} ({}) in project {}, \
                                 skipping time entry {}",
                                entry.task.name, entry.task.id, entry.project.id, entry.id
                            ),
                        }
                        EntryState::Skipped(reason)
                    }
                },

                EntryState::Submitting(new_entry) => {
                    attempts += 1;
                    match sink.create_time_entry(&new_entry).await? {
                        CreateOutcome::Created { id } => {
                            info!("Migrated time entry {} as {}", entry.id, id);
                            EntryState::Succeeded { created_id: id }
                        }
                        CreateOutcome::Rejected { error } => {
                            warn!("Time entry {} rejected: {}", entry.id, error);
                            EntryState::AwaitingDecision { error }
                        }
                    }
                }

                EntryState::AwaitingDecision { error } => {
                    let choices = FailureDecision::ALL
                        .iter()
                        .map(|d| Choice::new(d.label(), *d))
                        .collect();
                    let message = format!(
                        "Failed to create time entry: {}. What would you like to do?",
                        error
                    );
                    let decision = select_one(self.prompter.as_ref(), &message, choices).await?;

                    match decision {
                        FailureDecision::Remap => EntryState::Remapping,
                        FailureDecision::Skip => {
                            warn!("Skipping time entry {} at operator request", entry.id);
                            EntryState::Skipped(SkipReason::OperatorSkipped { error })
                        }
                        FailureDecision::Abort => EntryState::Aborted { error },
                    }
                }

                EntryState::Remapping => {
                    *mapping = self.remap.remap_failed_entry(mapping, entry).await?;
                    EntryState::Pending
                }

                EntryState::Succeeded { created_id } => {
                    return Ok((EntryOutcome::Succeeded { created_id }, attempts))
                }
                EntryState::Skipped(reason) => {
                    return Ok((EntryOutcome::Skipped(reason), attempts))
                }
                EntryState::Aborted { error } => {
                    return Ok((EntryOutcome::Aborted { error }, attempts))
                }
            };
        }
    }
}
