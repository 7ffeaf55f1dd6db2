//! Integration test: database-backed predictions and audit trail
//!
//! Needs a reachable PostgreSQL in `TEST_DATABASE_URL`; skipped otherwise.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use tokio::sync::OnceCell;
use tokio_test::assert_ok;

use common::{get, post_json, state_with, FixedProba};
use futurisys_predict::inference::{ModelBundle, FEATURE_COUNT};
use futurisys_predict::models::{Client, PredictionOutput, PredictionRequest};
use futurisys_predict::{create_router, db, AppState, ArtifactLoader};

static SCHEMA: OnceCell<()> = OnceCell::const_new();

async fn db_state() -> Option<AppState> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let bundle = ModelBundle::new(Arc::new(FixedProba(0.9))).with_threshold(0.5);
    let state = state_with(ArtifactLoader::preloaded(bundle), &url);

    SCHEMA
        .get_or_init(|| async {
            assert_ok!(db::run_migrations(&state.pool).await);
        })
        .await;

    Some(state)
}

#[tokio::test]
async fn test_predict_db_inserts_trace_rows() {
    let Some(state) = db_state().await else { return };
    let pool = state.pool.clone();
    let app = create_router(state);

    let client = assert_ok!(Client::create(&pool, &vec![0.0; FEATURE_COUNT]).await);

    let (status, body) = post_json(app.clone(), "/predict", json!({ "client_id": client.id })).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let label = body["label"].as_i64().unwrap();
    assert!(label == 0 || label == 1);
    let proba = body["proba"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&proba));

    // Traceability
    let requests = assert_ok!(PredictionRequest::list_by_client(&pool, client.id).await);
    let outputs = assert_ok!(PredictionOutput::list_by_client(&pool, client.id).await);
    assert_eq!(requests.len(), 1);
    assert_eq!(outputs.len(), 1);

    let req = &requests[0];
    let out = &outputs[0];
    assert_eq!(req.client_id, client.id);
    assert_eq!(req.features.len(), FEATURE_COUNT);
    assert_eq!(out.request_id, req.id);
    assert_eq!(out.label, 1);
    assert!((out.proba - 0.9).abs() < 1e-9);
    assert!((out.threshold - 0.5).abs() < 1e-12);
    assert_eq!(body["request_id"], req.id);

    // Audit trail is readable back
    let (status, trace) = get(app.clone(), &format!("/predictions/{}", req.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trace["request"]["client_id"], client.id);
    assert_eq!(trace["output"]["request_id"], req.id);

    let (status, detail) = get(app, &format!("/clients/{}", client.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["prediction_count"], 1);
    assert_eq!(detail["features"].as_array().unwrap().len(), FEATURE_COUNT);
}

#[tokio::test]
async fn test_predict_db_client_not_found() {
    let Some(state) = db_state().await else { return };
    let pool = state.pool.clone();
    let app = create_router(state);

    let missing = i64::MAX;
    let (status, body) = post_json(app, "/predict", json!({ "client_id": missing })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Client not found");

    let requests = assert_ok!(PredictionRequest::list_by_client(&pool, missing).await);
    let outputs = assert_ok!(PredictionOutput::list_by_client(&pool, missing).await);
    assert!(requests.is_empty());
    assert!(outputs.is_empty());
}

#[tokio::test]
async fn test_unknown_client_and_prediction_lookups() {
    let Some(state) = db_state().await else { return };
    let app = create_router(state);

    let (status, _) = get(app.clone(), &format!("/clients/{}", i64::MAX)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(app, &format!("/predictions/{}", i64::MAX)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_repeated_predictions_each_audited() {
    let Some(state) = db_state().await else { return };
    let pool = state.pool.clone();
    let app = create_router(state);

    let client = assert_ok!(Client::create(&pool, &vec![0.25; FEATURE_COUNT]).await);

    for _ in 0..3 {
        let (status, _) = post_json(app.clone(), "/predict", json!({ "client_id": client.id })).await;
        assert_eq!(status, StatusCode::OK);
    }

    let requests = assert_ok!(PredictionRequest::list_by_client(&pool, client.id).await);
    let outputs = assert_ok!(PredictionOutput::list_by_client(&pool, client.id).await);
    assert_eq!(requests.len(), 3);
    assert_eq!(outputs.len(), 3);
    for (req, out) in requests.iter().zip(&outputs) {
        assert_eq!(out.request_id, req.id);
    }
}
