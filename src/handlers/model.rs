//! Model metadata handler

use axum::{extract::State, Json};

use crate::{AppState, AppResult};
use crate::inference::ModelInfo;

/// Describe the loaded artifact
pub async fn info(State(state): State<AppState>) -> AppResult<Json<ModelInfo>> {
    let bundle = state.models.get()?;
    Ok(Json(bundle.info()))
}
