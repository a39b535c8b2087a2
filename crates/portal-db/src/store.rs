use chrono::{DateTime, Utc};
use uuid::Uuid;

use portal_types::api::Record;
use portal_types::models::{Contact, ContactUpdate, Interaction, NewContact, Table};

use crate::{Database, StoreResult};

/// Single-record contact operations used by the grid.
pub trait ContactStore: Send + Sync {
    /// Contacts of one category, ordered by creation time ascending.
    fn contacts_in_category(&self, category_id: Uuid) -> StoreResult<Vec<Contact>>;

    /// Inserts a row; the store assigns id and timestamps.
    fn insert_contact(&self, new: &NewContact) -> StoreResult<Contact>;

    /// Persists one column and returns the row's new `updated_at`.
    fn update_contact(&self, id: Uuid, update: &ContactUpdate) -> StoreResult<DateTime<Utc>>;

    fn delete_contact(&self, id: Uuid) -> StoreResult<()>;

    /// Store-side `contact_count + 1` with `last_contacted_at` refreshed.
    fn record_interaction(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Interaction>;
}

/// Whole-table access used by bulk export/import.
pub trait TableStore: Send + Sync {
    fn select_all(&self, table: Table) -> StoreResult<Vec<Record>>;

    /// Insert-or-update keyed by `id`.
    fn upsert(&self, table: Table, record: &Record) -> StoreResult<()>;
}

impl ContactStore for Database {
    fn contacts_in_category(&self, category_id: Uuid) -> StoreResult<Vec<Contact>> {
        self.get_contacts(category_id)
    }

    fn insert_contact(&self, new: &NewContact) -> StoreResult<Contact> {
        self.create_contact(new)
    }

    fn update_contact(&self, id: Uuid, update: &ContactUpdate) -> StoreResult<DateTime<Utc>> {
        self.update_contact_field(id, update)
    }

    fn delete_contact(&self, id: Uuid) -> StoreResult<()> {
        Database::delete_contact(self, id)
    }

    fn record_interaction(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Interaction> {
        self.increment_contact_count(id, at)
    }
}

impl TableStore for Database {
    fn select_all(&self, table: Table) -> StoreResult<Vec<Record>> {
        Database::select_all(self, table)
    }

    fn upsert(&self, table: Table, record: &Record) -> StoreResult<()> {
        self.upsert_record(table, record)
    }
}

impl<S: ContactStore + ?Sized> ContactStore for std::sync::Arc<S> {
    fn contacts_in_category(&self, category_id: Uuid) -> StoreResult<Vec<Contact>> {
        (**self).contacts_in_category(category_id)
    }

    fn insert_contact(&self, new: &NewContact) -> StoreResult<Contact> {
        (**self).insert_contact(new)
    }

    fn update_contact(&self, id: Uuid, update: &ContactUpdate) -> StoreResult<DateTime<Utc>> {
        (**self).update_contact(id, update)
    }

    fn delete_contact(&self, id: Uuid) -> StoreResult<()> {
        (**self).delete_contact(id)
    }

    fn record_interaction(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Interaction> {
        (**self).record_interaction(id, at)
    }
}
