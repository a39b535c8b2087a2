use axum::{Json, extract::State, response::IntoResponse};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

pub async fn list_email_templates(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let templates = blocking(move || Ok(db.list_email_templates()?)).await?;
    Ok(Json(templates))
}
