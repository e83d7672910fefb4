//! Fetch-event log and the history summary built from it.

pub mod events;
pub mod reporter;
