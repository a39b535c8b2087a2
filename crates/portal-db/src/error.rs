use rusqlite::ErrorCode;
use thiserror::Error;

/// Any failed read or write against the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{table} record not found: {id}")]
    NotFound { table: &'static str, id: String },

    #[error("Invalid {table} row: {reason}")]
    InvalidRow { table: &'static str, reason: String },

    #[error("Unknown column for {table}: {column}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("DB lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    pub fn not_found(table: &'static str, id: impl ToString) -> Self {
        Self::NotFound { table, id: id.to_string() }
    }

    pub fn invalid_row(table: &'static str, reason: impl ToString) -> Self {
        Self::InvalidRow { table, reason: reason.to_string() }
    }

    /// UNIQUE, PRIMARY KEY, CHECK or FOREIGN KEY rejection.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
