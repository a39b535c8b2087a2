use axum::{
    Json,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use portal_types::api::{
    AddUserEmailRequest, UpdateUserEmailStatusRequest, UserEmailQuery, UserEmailResponse,
};
use portal_types::models::{CREDITS_PER_COPY, UserEmail};
use portal_types::time;
use portal_views::{base_emails, copy_window_active, countdown, email_variations};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

fn respond(row: UserEmail, now: DateTime<Utc>) -> UserEmailResponse {
    UserEmailResponse {
        copy_window_active: copy_window_active(row.last_copied_at, now),
        row,
    }
}

/// Shortest addresses first, so the undotted base leads.
fn by_length(mut rows: Vec<UserEmail>, now: DateTime<Utc>) -> Vec<UserEmailResponse> {
    rows.sort_by_key(|r| r.email.len());
    rows.into_iter().map(|r| respond(r, now)).collect()
}

fn variations_of(raw: &str) -> Result<Vec<String>, ApiError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    Ok(email_variations(email))
}

/// One address per inbox among everything stored.
pub async fn list_bases(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let emails = blocking(move || Ok(db.list_user_email_addresses()?)).await?;
    Ok(Json(base_emails(&emails)))
}

/// Stores every dot-variation of the address that is not stored yet and
/// returns the full set.
pub async fn add_user_email(
    State(state): State<AppState>,
    payload: Result<Json<AddUserEmailRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let variations = variations_of(&req.email)?;

    let db = state.db.clone();
    let (inserted, rows) = blocking(move || {
        let inserted = db.insert_user_emails(&variations)?;
        Ok((inserted, db.get_user_emails(&variations)?))
    })
    .await?;
    info!("Stored {} new variations of {}", inserted, req.email.trim());

    Ok(Json(by_length(rows, time::now())))
}

pub async fn list_user_emails(
    State(state): State<AppState>,
    query: Result<Query<UserEmailQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let variations = variations_of(&query.base)?;

    let db = state.db.clone();
    let rows = blocking(move || Ok(db.get_user_emails(&variations)?)).await?;
    Ok(Json(by_length(rows, time::now())))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateUserEmailStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let db = state.db.clone();
    let row = blocking(move || Ok(db.set_user_email_status(id, req.status)?)).await?;
    Ok(Json(respond(row, time::now())))
}

/// Address copied to the clipboard: spend one step of monthly credits.
pub async fn record_copy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let now = time::now();
    let db = state.db.clone();
    let row = blocking(move || Ok(db.record_copy(id, CREDITS_PER_COPY, now)?)).await?;
    Ok(Json(respond(row, now)))
}

pub async fn reset_countdown() -> impl IntoResponse {
    Json(countdown(time::now()))
}
