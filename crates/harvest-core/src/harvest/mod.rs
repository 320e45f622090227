//! Harvest account data: records, directory seams, and the REST client.

mod client;
mod directory;
mod types;

pub use client::HarvestClient;
pub use directory::{EntityDirectory, TimeEntrySink};
pub use types::{
    CreateOutcome, HarvestAccount, HarvestProject, HarvestUser, NamedRef, NewTimeEntry,
    TaskAssignment, TimeEntry,
};
