//! Bulk export/import of every managed table as one JSON envelope.
//!
//! Export reads all tables side by side and never fails as a whole: a
//! table that cannot be read is logged and exported empty. Import upserts
//! record by record, so one bad record costs one error in its table's
//! tally and nothing else.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::future::join_all;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use portal_db::TableStore;
use portal_types::api::{ENVELOPE_VERSION, ErrorResponse, ExportEnvelope, ImportResponse, TableTally};
use portal_types::models::Table;
use portal_types::time;

use crate::state::AppState;

#[derive(Error, Debug)]
pub enum TransferError {
    /// The payload is not an envelope; nothing was written.
    #[error("Invalid import payload: {0}")]
    Validation(String),

    /// Some records of a table were rejected. Logged, never returned.
    #[error("{errors} {table} record(s) failed to import")]
    PartialFailure { table: Table, errors: u64 },

    #[error("Background task failed: {0}")]
    Join(#[from] JoinError),
}

impl IntoResponse for TransferError {
    fn into_response(self) -> Response {
        error!("Transfer failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: self.to_string() }),
        )
            .into_response()
    }
}

/// Snapshot of every table, one blocking read per table in parallel.
pub async fn export_snapshot<S>(store: Arc<S>) -> ExportEnvelope
where
    S: TableStore + ?Sized + 'static,
{
    let reads = Table::IMPORT_ORDER.into_iter().map(|table| {
        let store = store.clone();
        async move {
            let rows = match tokio::task::spawn_blocking(move || store.select_all(table)).await {
                Ok(Ok(rows)) => rows,
                Ok(Err(e)) => {
                    warn!("Error exporting {}: {}", table, e);
                    Vec::new()
                }
                Err(e) => {
                    error!("spawn_blocking join error exporting {}: {}", table, e);
                    Vec::new()
                }
            };
            (table.name().to_string(), rows)
        }
    });

    ExportEnvelope {
        version: ENVELOPE_VERSION.to_string(),
        exported_at: time::now(),
        tables: join_all(reads).await.into_iter().collect(),
    }
}

/// Restores an envelope by upserting each record on `id`, tables in
/// dependency order. Only a payload without a `tables` object is fatal.
pub fn import_snapshot<S>(store: &S, payload: &Value) -> Result<BTreeMap<String, TableTally>, TransferError>
where
    S: TableStore + ?Sized,
{
    let tables = payload
        .as_object()
        .ok_or_else(|| TransferError::Validation("expected a JSON object".into()))?
        .get("tables")
        .and_then(Value::as_object)
        .ok_or_else(|| TransferError::Validation("missing 'tables' object".into()))?;

    for name in tables.keys() {
        if name.parse::<Table>().is_err() {
            warn!("Ignoring unknown table '{}' in import", name);
        }
    }

    let mut results = BTreeMap::new();
    for table in Table::IMPORT_ORDER {
        let mut tally = TableTally::default();

        match tables.get(table.name()) {
            Some(Value::Array(records)) => {
                for (idx, record) in records.iter().enumerate() {
                    let outcome = match record {
                        Value::Object(record) => store.upsert(table, record).map_err(|e| e.to_string()),
                        _ => Err("record is not an object".to_string()),
                    };
                    match outcome {
                        Ok(()) => tally.inserted += 1,
                        Err(reason) => {
                            warn!("Error importing {} record #{}: {}", table, idx, reason);
                            tally.errors += 1;
                        }
                    }
                }
            }
            Some(_) => warn!("Skipping {}: expected an array of records", table),
            None => debug!("No {} in import payload", table),
        }

        if tally.errors > 0 {
            warn!("{}", TransferError::PartialFailure { table, errors: tally.errors });
        }
        debug!("Imported {}: {} upserted, {} errors", table, tally.inserted, tally.errors);
        results.insert(table.name().to_string(), tally);
    }

    Ok(results)
}

pub async fn export_data(State(state): State<AppState>) -> impl IntoResponse {
    info!("Starting data export...");
    let envelope = export_snapshot(state.db.clone()).await;

    let total: usize = envelope.tables.values().map(Vec::len).sum();
    info!("Export complete: {} records across {} tables", total, envelope.tables.len());
    Json(envelope)
}

pub async fn import_data(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, TransferError> {
    info!("Starting data import...");
    let payload: Value =
        serde_json::from_slice(&body).map_err(|e| TransferError::Validation(e.to_string()))?;

    let db = state.db.clone();
    let results = tokio::task::spawn_blocking(move || import_snapshot(db.as_ref(), &payload))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            TransferError::Join(e)
        })??;

    info!("Import complete: {:?}", results);
    Ok(Json(ImportResponse { success: true, results }))
}
