//! Client-side state for the editable contacts grid.
//!
//! `RowSync` keeps a local list of contacts consistent with a `ContactStore`:
//! every mutation goes to the store first and is mirrored locally only once
//! the store acknowledges it. `GridController` turns discrete UI events
//! (cell activation, typing, Enter/Escape, status picks, column drags) into
//! `RowSync` calls and owns the purely presentational state.

pub mod columns;
pub mod controller;
pub mod error;
pub mod sync;

pub use columns::{ColumnWidths, MIN_COLUMN_WIDTH};
pub use controller::{CommitOutcome, EditCursor, GridController, Key};
pub use error::{GridError, SyncError};
pub use sync::RowSync;

#[cfg(test)]
pub(crate) mod test_support;
