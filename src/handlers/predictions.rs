//! Prediction audit trail handlers

use axum::{extract::{State, Path}, Json};

use crate::{AppState, AppResult, AppError};
use crate::models::PredictionTrace;

/// Get a recorded request with its output
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PredictionTrace>> {
    let trace = PredictionTrace::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Prediction request not found".to_string()))?;

    Ok(Json(trace))
}
