//! Prediction handler

use axum::{extract::State, Json};

use crate::{AppState, AppResult, AppError};
use crate::extract::ValidatedJson;
use crate::inference::{predict_features, predict_text};
use crate::models::{
    Client, PredictRequest, PredictResponse,
    PredictionRequest, PredictionOutput,
};

/// Score features, text, or a stored client
pub async fn predict(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PredictRequest>,
) -> AppResult<Json<PredictResponse>> {
    let response: PredictResponse = match req {
        PredictRequest::Features(input) => {
            let bundle = state.models.get()?;
            predict_features(&bundle, &input.features)?.into()
        }
        PredictRequest::Text(input) => {
            let bundle = state.models.get()?;
            predict_text(&bundle, &input.text)?.into()
        }
        PredictRequest::Client(input) => predict_for_client(&state, input.client_id).await?,
    };

    tracing::debug!("Prediction: label={} proba={:.4}", response.label, response.proba);

    Ok(Json(response))
}

/// Score a stored client and record the request/output pair
async fn predict_for_client(state: &AppState, client_id: i64) -> AppResult<PredictResponse> {
    let client = Client::find_by_id(&state.pool, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    let bundle = state.models.get()?;
    let prediction = predict_features(&bundle, &client.features)?;

    // Both audit rows or neither
    let mut tx = state.pool.begin().await?;
    let request = PredictionRequest::create(&mut *tx, client.id, &client.features).await?;
    let output = PredictionOutput::create(&mut *tx, request.id, &prediction).await?;
    tx.commit().await?;

    tracing::info!(
        client_id = client.id,
        request_id = request.id,
        output_id = output.id,
        "Prediction recorded: label={} proba={:.4}",
        output.label,
        output.proba
    );

    Ok(PredictResponse {
        label: output.label,
        proba: output.proba,
        threshold: output.threshold,
        request_id: Some(request.id),
    })
}
