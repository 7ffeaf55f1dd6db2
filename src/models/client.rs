//! Client model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub features: Vec<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub prediction_count: i64,
}

impl Client {
    pub async fn create(pool: &PgPool, features: &[f64]) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Client>(
            "INSERT INTO clients (features) VALUES ($1) RETURNING *"
        )
        .bind(features)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn prediction_count(pool: &PgPool, id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM prediction_requests WHERE client_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
