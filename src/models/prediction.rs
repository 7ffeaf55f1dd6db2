//! Prediction model - API payloads and audit trail rows

use serde::{de, Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use chrono::{DateTime, Utc};
use validator::{Validate, ValidationErrors};

use crate::inference::Prediction;

// ============================================================================
// API PAYLOADS
// ============================================================================

/// Body of `POST /predict`: exactly one input form, no extra fields
#[derive(Debug)]
pub enum PredictRequest {
    Features(FeaturesInput),
    Text(TextInput),
    Client(ClientInput),
}

const INPUT_KEYS: [&str; 3] = ["features", "text", "client_id"];

// Dispatch on the input key so errors name the actual problem
impl<'de> Deserialize<'de> for PredictRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let body = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;

        let present: Vec<&str> = INPUT_KEYS
            .iter()
            .copied()
            .filter(|key| body.contains_key(*key))
            .collect();

        let key = match present.as_slice() {
            [key] => *key,
            [] => {
                return Err(de::Error::custom(
                    "expected one of `features`, `text` or `client_id`",
                ))
            }
            keys => {
                return Err(de::Error::custom(format!(
                    "only one of `features`, `text` or `client_id` may be given, got {}",
                    keys.join(", ")
                )))
            }
        };

        let body = serde_json::Value::Object(body);
        let request = match key {
            "features" => serde_json::from_value(body).map(PredictRequest::Features),
            "text" => serde_json::from_value(body).map(PredictRequest::Text),
            _ => serde_json::from_value(body).map(PredictRequest::Client),
        };

        request.map_err(de::Error::custom)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FeaturesInput {
    // Must match inference::FEATURE_COUNT
    #[validate(length(equal = 61, message = "features must contain exactly 61 values"))]
    pub features: Vec<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TextInput {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ClientInput {
    #[validate(range(min = 1, message = "client_id must be positive"))]
    pub client_id: i64,
}

impl Validate for PredictRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            PredictRequest::Features(input) => input.validate(),
            PredictRequest::Text(input) => input.validate(),
            PredictRequest::Client(input) => input.validate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub label: i32,
    pub proba: f64,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        Self {
            label: p.label,
            proba: p.proba,
            threshold: p.threshold,
            request_id: None,
        }
    }
}

// ============================================================================
// AUDIT ROWS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PredictionRequest {
    pub id: i64,
    pub client_id: i64,
    pub features: Vec<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PredictionOutput {
    pub id: i64,
    pub request_id: i64,
    pub label: i32,
    pub proba: f64,
    pub threshold: f64,
    pub created_at: DateTime<Utc>,
}

/// A request row together with the output recorded for it
#[derive(Debug, Clone, Serialize)]
pub struct PredictionTrace {
    pub request: PredictionRequest,
    pub output: Option<PredictionOutput>,
}

impl PredictionRequest {
    pub async fn create(
        conn: &mut PgConnection,
        client_id: i64,
        features: &[f64],
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PredictionRequest>(
            r#"
            INSERT INTO prediction_requests (client_id, features)
            VALUES ($1, $2)
            RETURNING *
            "#
        )
        .bind(client_id)
        .bind(features)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PredictionRequest>("SELECT * FROM prediction_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_client(pool: &PgPool, client_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PredictionRequest>(
            "SELECT * FROM prediction_requests WHERE client_id = $1 ORDER BY id ASC"
        )
        .bind(client_id)
        .fetch_all(pool)
        .await
    }
}

impl PredictionOutput {
    pub async fn create(
        conn: &mut PgConnection,
        request_id: i64,
        prediction: &Prediction,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PredictionOutput>(
            r#"
            INSERT INTO prediction_outputs (request_id, label, proba, threshold)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(request_id)
        .bind(prediction.label)
        .bind(prediction.proba)
        .bind(prediction.threshold)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_request(pool: &PgPool, request_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PredictionOutput>(
            "SELECT * FROM prediction_outputs WHERE request_id = $1 ORDER BY id ASC LIMIT 1"
        )
        .bind(request_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_client(pool: &PgPool, client_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PredictionOutput>(
            r#"
            SELECT o.* FROM prediction_outputs o
            JOIN prediction_requests r ON o.request_id = r.id
            WHERE r.client_id = $1
            ORDER BY o.id ASC
            "#
        )
        .bind(client_id)
        .fetch_all(pool)
        .await
    }
}

impl PredictionTrace {
    pub async fn find(pool: &PgPool, request_id: i64) -> Result<Option<Self>, sqlx::Error> {
        let Some(request) = PredictionRequest::find_by_id(pool, request_id).await? else {
            return Ok(None);
        };
        let output = PredictionOutput::find_by_request(pool, request_id).await?;

        Ok(Some(Self { request, output }))
    }
}
