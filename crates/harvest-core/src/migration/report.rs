//! Per-entry outcomes of a migration run.

use std::fmt;

/// Why an entry was not migrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry's project has no mapping.
    UnmappedProject,
    /// The entry's task has no mapping in its project.
    UnmappedTask,
    /// The destination rejected the entry and the operator chose to skip it.
    OperatorSkipped { error: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnmappedProject => f.write_str("no mapping found for project"),
            SkipReason::UnmappedTask => f.write_str("no mapping found for task"),
            SkipReason::OperatorSkipped { error } => write!(f, "skipped by operator: {}", error),
        }
    }
}

/// Terminal outcome of one processed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Succeeded { created_id: u64 },
    Skipped(SkipReason),
    /// The operator stopped the run on this entry.
    Aborted { error: String },
}

/// Outcome of one source entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryReport {
    pub entry_id: u64,
    pub summary: String,
    pub outcome: EntryOutcome,
    /// Number of submissions made to the destination.
    pub attempts: u32,
}

/// Result of [`crate::migration::MigrationRunner::run_migration`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Processed entries, in input order.
    pub entries: Vec<EntryReport>,
    pub aborted: bool,
    /// Entries never reached because the run was aborted.
    pub untouched: usize,
}

impl MigrationReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Succeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Skipped(_)))
    }

    pub fn total_attempts(&self) -> u32 {
        self.entries.iter().map(|e| e.attempts).sum()
    }

    /// Outcome recorded for a source entry, if it was processed.
    pub fn outcome_of(&self, entry_id: u64) -> Option<&EntryOutcome> {
        self.entries
            .iter()
            .find(|e| e.entry_id == entry_id)
            .map(|e| &e.outcome)
    }

    fn count(&self, predicate: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.outcome)).count()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match &entry.outcome {
                EntryOutcome::Succeeded { created_id } => writeln!(
                    f,
                    "  migrated  {} -> {} ({})",
                    entry.entry_id, created_id, entry.summary
                )?,
                EntryOutcome::Skipped(reason) => writeln!(
                    f,
                    "  skipped   {} ({}): {}",
                    entry.entry_id, entry.summary, reason
                )?,
                EntryOutcome::Aborted { error } => writeln!(
                    f,
                    "  aborted   {} ({}): {}",
                    entry.entry_id, entry.summary, error
                )?,
            }
        }
        write!(
            f,
            "{} migrated, {} skipped",
            self.succeeded(),
            self.skipped()
        )?;
        if self.aborted {
            write!(f, ", aborted with {} entries untouched", self.untouched)?;
        }
        Ok(())
    }
}
