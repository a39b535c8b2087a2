use tracing::{debug, warn};
use uuid::Uuid;

use portal_db::ContactStore;
use portal_types::models::{Contact, ContactField, ContactStatus, ContactUpdate, NewContact};
use portal_types::time;

use crate::error::SyncError;

/// Local cache of one category's contacts, kept in step with the store.
///
/// Writes are persisted before they are mirrored: a failed store call
/// leaves the local list exactly as it was.
pub struct RowSync<S> {
    store: S,
    rows: Vec<Contact>,
}

impl<S: ContactStore> RowSync<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[Contact] {
        &self.rows
    }

    pub fn get(&self, id: Uuid) -> Option<&Contact> {
        self.rows.iter().find(|c| c.id == id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replaces the whole local list with the category's contacts.
    pub fn load(&mut self, category_id: Uuid) -> Result<usize, SyncError> {
        let rows = self.store.contacts_in_category(category_id).map_err(|e| {
            warn!("Failed to load contacts for category {}: {}", category_id, e);
            e
        })?;
        debug!("Loaded {} contacts for category {}", rows.len(), category_id);
        self.rows = rows;
        Ok(self.rows.len())
    }

    /// Inserts a row and appends the stored record.
    pub fn create(&mut self, defaults: NewContact) -> Result<Contact, SyncError> {
        let contact = self.store.insert_contact(&defaults).map_err(|e| {
            warn!("Failed to add contact: {}", e);
            e
        })?;
        self.rows.push(contact.clone());
        Ok(contact)
    }

    /// Normalizes `raw` for `field`, persists it, then mirrors it.
    pub fn set_field(&mut self, id: Uuid, field: ContactField, raw: &str) -> Result<(), SyncError> {
        let update = ContactUpdate::parse(field, raw)?;
        self.apply(id, update)
    }

    pub fn set_status(&mut self, id: Uuid, status: ContactStatus) -> Result<(), SyncError> {
        self.apply(id, ContactUpdate::Status(status))
    }

    fn apply(&mut self, id: Uuid, update: ContactUpdate) -> Result<(), SyncError> {
        let idx = self.index_of(id)?;

        let updated_at = self.store.update_contact(id, &update).map_err(|e| {
            warn!("Failed to update {} on contact {}: {}", update.field(), id, e);
            e
        })?;

        let contact = &mut self.rows[idx];
        update.apply(contact);
        contact.updated_at = updated_at;
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<(), SyncError> {
        self.store.delete_contact(id).map_err(|e| {
            warn!("Failed to delete contact {}: {}", id, e);
            e
        })?;
        self.rows.retain(|c| c.id != id);
        Ok(())
    }

    /// Outbound email or call: one more contact, stamped now.
    pub fn record_interaction(&mut self, id: Uuid) -> Result<&Contact, SyncError> {
        let idx = self.index_of(id)?;

        let interaction = self.store.record_interaction(id, time::now()).map_err(|e| {
            warn!("Failed to record interaction on contact {}: {}", id, e);
            e
        })?;

        let contact = &mut self.rows[idx];
        contact.contact_count = interaction.contact_count;
        contact.last_contacted_at = Some(interaction.last_contacted_at);
        contact.updated_at = interaction.updated_at;
        Ok(&self.rows[idx])
    }

    fn index_of(&self, id: Uuid) -> Result<usize, SyncError> {
        self.rows
            .iter()
            .position(|c| c.id == id)
            .ok_or(SyncError::UnknownRecord(id))
    }
}
