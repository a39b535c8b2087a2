use tracing::{debug, warn};
use uuid::Uuid;

use portal_db::ContactStore;
use portal_types::models::{Contact, ContactField, ContactStatus, NewContact};

use crate::columns::ColumnWidths;
use crate::error::{GridError, SyncError};
use crate::sync::RowSync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
}

/// The one text cell currently open for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCursor {
    pub id: Uuid,
    pub field: ContactField,
    pub draft: String,
}

/// What closing the edit cursor did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// No cell was open.
    Idle,
    /// The draft was persisted and mirrored.
    Saved,
    /// The row was a never-edited new row left blank, so it was deleted.
    Removed,
}

/// Drives a `RowSync` from grid input events.
///
/// Per-record edit lifecycle: `Idle -> Editing -> Committing -> Idle`, or
/// `Editing -> Cancelled -> Idle` on Escape. Every method finishes its store
/// round trip before returning, so edits to a record reach the store in the
/// order they were issued.
pub struct GridController<S> {
    sync: RowSync<S>,
    cursor: Option<EditCursor>,
    /// Row inserted by `add_row` that has not been committed yet.
    new_row: Option<Uuid>,
    columns: ColumnWidths,
}

impl<S: ContactStore> GridController<S> {
    pub fn new(store: S) -> Self {
        Self {
            sync: RowSync::new(store),
            cursor: None,
            new_row: None,
            columns: ColumnWidths::new(),
        }
    }

    pub fn rows(&self) -> &[Contact] {
        self.sync.rows()
    }

    pub fn sync(&self) -> &RowSync<S> {
        &self.sync
    }

    pub fn cursor(&self) -> Option<&EditCursor> {
        self.cursor.as_ref()
    }

    pub fn new_row(&self) -> Option<Uuid> {
        self.new_row
    }

    pub fn columns(&self) -> &ColumnWidths {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut ColumnWidths {
        &mut self.columns
    }

    /// Loads a category. Any open cell is discarded, not committed.
    pub fn load(&mut self, category_id: Uuid) -> Result<usize, GridError> {
        let count = self.sync.load(category_id)?;
        self.cursor = None;
        self.new_row = None;
        Ok(count)
    }

    /// Opens a text cell. An open cell elsewhere is committed first, and the
    /// new cell opens even when that commit fails; the failure is returned.
    pub fn activate(&mut self, id: Uuid, field: ContactField) -> Result<CommitOutcome, GridError> {
        if field.is_enumerated() {
            return Err(GridError::EnumeratedField(field));
        }
        if self
            .cursor
            .as_ref()
            .is_some_and(|c| c.id == id && c.field == field)
        {
            return Ok(CommitOutcome::Idle);
        }
        if self.sync.get(id).is_none() {
            return Err(SyncError::UnknownRecord(id).into());
        }

        let prior = self.commit();

        // Committing the previous cell may have removed this very row.
        if let Some(contact) = self.sync.get(id) {
            self.cursor = Some(EditCursor {
                id,
                field,
                draft: contact.field_text(field).unwrap_or_default().to_string(),
            });
        }

        prior
    }

    /// Replaces the draft of the open cell. Returns false when nothing is open.
    pub fn input(&mut self, text: &str) -> bool {
        match self.cursor.as_mut() {
            Some(cursor) => {
                cursor.draft.clear();
                cursor.draft.push_str(text);
                true
            }
            None => false,
        }
    }

    pub fn key(&mut self, key: Key) -> Result<CommitOutcome, GridError> {
        match key {
            Key::Enter => self.commit(),
            Key::Escape => {
                self.cancel();
                Ok(CommitOutcome::Idle)
            }
        }
    }

    /// Blur or Enter: persist the draft and close the cell.
    ///
    /// The cell closes even if the store rejects the write; the row keeps
    /// its previous value.
    pub fn commit(&mut self) -> Result<CommitOutcome, GridError> {
        let Some(cursor) = self.cursor.take() else {
            return Ok(CommitOutcome::Idle);
        };
        let was_new = self.new_row.take() == Some(cursor.id);

        if was_new && self.is_abandoned(&cursor) {
            debug!("Removing abandoned new contact {}", cursor.id);
            self.sync.remove(cursor.id)?;
            return Ok(CommitOutcome::Removed);
        }

        self.sync
            .set_field(cursor.id, cursor.field, &cursor.draft)
            .map_err(|e| {
                warn!("Edit of {} on contact {} was not saved: {}", cursor.field, cursor.id, e);
                e
            })?;
        Ok(CommitOutcome::Saved)
    }

    /// Escape: close the cell without persisting. A new row stays in place.
    pub fn cancel(&mut self) -> bool {
        self.new_row = None;
        self.cursor.take().is_some()
    }

    /// Inserts a blank row and opens its business-name cell.
    pub fn add_row(&mut self, category_id: Uuid) -> Result<Contact, GridError> {
        self.commit()?;

        let contact = self.sync.create(NewContact::blank(category_id))?;
        self.new_row = Some(contact.id);
        self.cursor = Some(EditCursor {
            id: contact.id,
            field: ContactField::BusinessName,
            draft: String::new(),
        });
        Ok(contact)
    }

    /// Status picks commit straight away and leave any open cell alone.
    pub fn select_status(&mut self, id: Uuid, status: ContactStatus) -> Result<(), GridError> {
        Ok(self.sync.set_status(id, status)?)
    }

    pub fn delete_row(&mut self, id: Uuid) -> Result<(), GridError> {
        self.sync.remove(id)?;
        if self.cursor.as_ref().is_some_and(|c| c.id == id) {
            self.cursor = None;
        }
        if self.new_row == Some(id) {
            self.new_row = None;
        }
        Ok(())
    }

    pub fn record_interaction(&mut self, id: Uuid) -> Result<Contact, GridError> {
        Ok(self.sync.record_interaction(id)?.clone())
    }

    fn is_abandoned(&self, cursor: &EditCursor) -> bool {
        // A new row's stored name is still null, so the row must be blank too.
        cursor.field == ContactField::BusinessName
            && cursor.draft.trim().is_empty()
            && self.sync.get(cursor.id).is_some_and(Contact::is_blank)
    }
}
