use std::cmp::Reverse;

use serde::Serialize;

use portal_types::models::{Contact, ContactStatus};

/// Sort rank for the active list; higher sorts first.
pub fn priority(status: ContactStatus) -> u8 {
    match status {
        ContactStatus::Lead => 1,
        ContactStatus::Rejected => 2,
        ContactStatus::ClosedLost => 3,
        ContactStatus::Contacted => 4,
        ContactStatus::DecisionPending => 5,
        ContactStatus::DemoStage => 6,
        ContactStatus::ClosedWon => 7,
        // Never ranked: completed rows are filtered out of the active list.
        ContactStatus::Completed => 8,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusPartition {
    pub active: Vec<Contact>,
    pub completed: Vec<Contact>,
}

/// Splits contacts into the active pipeline and the completed archive.
///
/// Active rows are ordered by descending `priority`, keeping load order
/// among equal ranks. Completed rows are newest-updated first.
pub fn partition_by_status(contacts: &[Contact]) -> StatusPartition {
    let (mut completed, mut active): (Vec<Contact>, Vec<Contact>) = contacts
        .iter()
        .cloned()
        .partition(|c| c.status == ContactStatus::Completed);

    active.sort_by_key(|c| Reverse(priority(c.status)));
    completed.sort_by_key(|c| Reverse(c.updated_at));

    StatusPartition { active, completed }
}
