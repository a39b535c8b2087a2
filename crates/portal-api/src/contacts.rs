use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use portal_db::StoreError;
use portal_types::api::{CreateContactRequest, UpdateContactRequest};
use portal_types::models::{Contact, ContactUpdate, NewContact, normalize_text};
use portal_types::time;
use portal_views::partition_by_status;

use crate::error::{ApiError, blocking};
use crate::state::AppState;

fn normalize(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(normalize_text)
}

fn reload(db: &portal_db::Database, id: Uuid) -> Result<Contact, ApiError> {
    db.get_contact(id)?
        .ok_or_else(|| StoreError::not_found("contacts", id).into())
}

pub async fn list_contacts(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let contacts = blocking(move || Ok(db.get_contacts(category_id)?)).await?;
    Ok(Json(contacts))
}

pub async fn contacts_partition(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let contacts = blocking(move || Ok(db.get_contacts(category_id)?)).await?;
    Ok(Json(partition_by_status(&contacts)))
}

pub async fn create_contact(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    payload: Result<Json<CreateContactRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let mut new = NewContact::blank(category_id);
    new.business_name = normalize(req.business_name);
    new.email = normalize(req.email);
    new.mobile_number = normalize(req.mobile_number);
    new.link = normalize(req.link);
    new.notes = normalize(req.notes);
    if let Some(status) = req.status {
        new.status = status;
    }

    let db = state.db.clone();
    let contact = blocking(move || {
        db.create_contact(&new).map_err(|e| {
            // The only foreign key on an insert is the category.
            if e.is_constraint_violation() {
                StoreError::not_found("contact_categories", category_id).into()
            } else {
                ApiError::from(e)
            }
        })
    })
    .await?;
    debug!("Created contact {} in category {}", contact.id, category_id);

    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateContactRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let update = ContactUpdate::parse(req.field, &req.value)?;

    let db = state.db.clone();
    let contact = blocking(move || {
        db.update_contact_field(id, &update)?;
        reload(&db, id)
    })
    .await?;

    Ok(Json(contact))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    blocking(move || Ok(db.delete_contact(id)?)).await?;
    debug!("Deleted contact {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Outbound email or call on a contact.
pub async fn record_interaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let contact = blocking(move || {
        db.increment_contact_count(id, time::now())?;
        reload(&db, id)
    })
    .await?;

    Ok(Json(contact))
}
