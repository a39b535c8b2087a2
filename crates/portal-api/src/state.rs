use std::sync::Arc;

use portal_db::Database;

/// Default cap on an import request body: 64 MiB.
pub const DEFAULT_MAX_IMPORT_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub max_import_bytes: usize,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            max_import_bytes: DEFAULT_MAX_IMPORT_BYTES,
        }
    }
}
