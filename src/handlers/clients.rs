//! Clients handlers

use axum::{extract::{State, Path}, Json};

use crate::{AppState, AppResult, AppError};
use crate::models::{Client, ClientDetail};

/// Get single client with its prediction count
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ClientDetail>> {
    let client = Client::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    let prediction_count = Client::prediction_count(&state.pool, id).await?;

    Ok(Json(ClientDetail { client, prediction_count }))
}
