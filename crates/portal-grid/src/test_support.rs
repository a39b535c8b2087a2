use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use portal_db::{ContactStore, Database, StoreError, StoreResult};
use portal_types::models::{Contact, ContactUpdate, Interaction, NewContact};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Load,
    Insert,
    Update,
    Delete,
    Interaction,
}

/// Real database behind a switch that makes the next call of an
/// operation fail, and a counter of calls that reached the store.
#[derive(Clone)]
pub struct FlakyStore {
    inner: Arc<Inner>,
}

struct Inner {
    db: Database,
    armed: Mutex<HashSet<Op>>,
    calls: Mutex<HashMap<Op, usize>>,
    _dir: TempDir,
}

impl FlakyStore {
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// The next call of `op` fails without touching the database.
    pub fn fail(&self, op: Op) {
        self.inner.armed.lock().unwrap().insert(op);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.inner.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    fn enter(&self, op: Op) -> StoreResult<()> {
        *self.inner.calls.lock().unwrap().entry(op).or_default() += 1;
        if self.inner.armed.lock().unwrap().remove(&op) {
            return Err(StoreError::invalid_row("contacts", format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

impl ContactStore for FlakyStore {
    fn contacts_in_category(&self, category_id: Uuid) -> StoreResult<Vec<Contact>> {
        self.enter(Op::Load)?;
        self.inner.db.contacts_in_category(category_id)
    }

    fn insert_contact(&self, new: &NewContact) -> StoreResult<Contact> {
        self.enter(Op::Insert)?;
        self.inner.db.insert_contact(new)
    }

    fn update_contact(&self, id: Uuid, update: &ContactUpdate) -> StoreResult<DateTime<Utc>> {
        self.enter(Op::Update)?;
        self.inner.db.update_contact(id, update)
    }

    fn delete_contact(&self, id: Uuid) -> StoreResult<()> {
        self.enter(Op::Delete)?;
        ContactStore::delete_contact(&self.inner.db, id)
    }

    fn record_interaction(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Interaction> {
        self.enter(Op::Interaction)?;
        self.inner.db.record_interaction(id, at)
    }
}

pub struct TestGrid {
    pub store: FlakyStore,
    pub category_id: Uuid,
    pub other_category_id: Uuid,
}

pub fn setup() -> TestGrid {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_with_readers(&dir.path().join("grid.db"), 1).unwrap();
    let category_id = db.create_category("Cafes").unwrap().id;
    let other_category_id = db.create_category("Gyms").unwrap().id;

    TestGrid {
        store: FlakyStore {
            inner: Arc::new(Inner {
                db,
                armed: Mutex::new(HashSet::new()),
                calls: Mutex::new(HashMap::new()),
                _dir: dir,
            }),
        },
        category_id,
        other_category_id,
    }
}
