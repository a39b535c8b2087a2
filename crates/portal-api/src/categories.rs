use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use portal_types::api::CreateCategoryRequest;

use crate::error::{ApiError, blocking};
use crate::state::AppState;

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let categories = blocking(move || Ok(db.list_categories()?)).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("Category name is required"));
    }

    let db = state.db.clone();
    let category = blocking(move || Ok(db.create_category(&name)?)).await?;
    info!("Created category '{}' ({})", category.name, category.id);

    Ok((StatusCode::CREATED, Json(category)))
}
