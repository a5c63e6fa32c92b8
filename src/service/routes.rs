//! API handlers

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::predict::Predictor;
use crate::service::errors::ApiError;
use crate::service::AppState;
use crate::{Prediction, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeamListResponse {
    pub teams: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub home: String,
    pub away: String,
    pub date: Option<String>,
}

/// Run blocking predictor work off the async runtime
async fn with_predictor<T, F>(state: Arc<AppState>, f: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Predictor) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut predictor = state
            .predictor
            .lock()
            .map_err(|_| ApiError::internal("predictor state poisoned"))?;
        f(&mut *predictor).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::internal(format!("prediction task failed: {e}")))?
}

/// GET /v1/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// GET /v1/teams
pub async fn teams(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<TeamListResponse>, ApiError> {
    let teams = with_predictor(state, |p| p.teams()).await?;
    Ok(Json(TeamListResponse {
        teams: teams.into_iter().map(|t| t.0).collect(),
    }))
}

/// GET /v1/predict?home=NYK&away=BOS&date=2024-03-01
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictQuery>,
) -> std::result::Result<Json<Prediction>, ApiError> {
    let as_of = query
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| {
            NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                .map_err(|_| ApiError::bad_request(format!("invalid date {d:?}, expected YYYY-MM-DD")))
        })
        .transpose()?;

    let prediction =
        with_predictor(state, move |p| p.predict(&query.home, &query.away, as_of)).await?;
    Ok(Json(prediction))
}
