use thiserror::Error;
use uuid::Uuid;

use portal_db::StoreError;
use portal_types::models::{ContactField, FieldError};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidValue(#[from] FieldError),

    #[error("Contact not loaded: {0}")]
    UnknownRecord(Uuid),
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("{0} is picked from a list, not edited as text")]
    EnumeratedField(ContactField),
}

impl From<StoreError> for GridError {
    fn from(e: StoreError) -> Self {
        Self::Sync(SyncError::Store(e))
    }
}
