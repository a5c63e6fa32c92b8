//! HTTP prediction service
//!
//! `axum` routes under `/v1` backed by a shared, lazily loaded [`Predictor`].

pub mod errors;
pub mod routes;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::routing::get;
use axum::Router;
use log::info;

use crate::predict::Predictor;
use crate::{Config, PredictorError, Result};

pub use errors::ApiError;

/// State shared by all handlers
pub struct AppState {
    pub predictor: Mutex<Predictor>,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        AppState {
            predictor: Mutex::new(predictor),
        }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(routes::health))
        .route("/v1/teams", get(routes::teams))
        .route("/v1/predict", get(routes::predict))
        .with_state(Arc::new(state))
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &Config) -> Result<()> {
    let addr: SocketAddr = config.server.addr.parse().map_err(|e| {
        PredictorError::Config(format!("invalid server.addr {:?}: {}", config.server.addr, e))
    })?;

    let app = router(AppState::new(Predictor::new(config)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Serving predictions on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::data::Database;
    use crate::features::build_feature_table;
    use crate::training::Trainer;
    use crate::GameRecord;

    fn season() -> Vec<GameRecord> {
        let pairs = [("NYK", "BOS"), ("BOS", "MIA"), ("MIA", "NYK")];
        (0..24u32)
            .map(|i| {
                let (home, away) = pairs[i as usize % 3];
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(2 * i as u64);
                GameRecord::new(date, home, away, 100 + (i * 7) % 15, 98 + (i * 5) % 11)
            })
            .collect()
    }

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.data.data_dir = dir.to_path_buf();
        config.data.artifacts_dir = dir.join("artifacts");
        config.training.epochs = 30;
        config
    }

    fn app(config: &Config, with_model: bool) -> Router {
        let games = season();
        Database::open(config.data.database_path())
            .unwrap()
            .upsert_games(&games)
            .unwrap();
        if with_model {
            build_feature_table(&games, &config.feature_config())
                .unwrap()
                .write_csv(config.data.features_path())
                .unwrap();
            Trainer::new(config).run(&["logreg".to_string()]).unwrap();
        }
        router(AppState::new(Predictor::new(config)))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_and_teams() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&test_config(dir.path()), false);

        let (status, body) = get(app.clone(), "/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"ok": true}));

        let (status, body) = get(app, "/v1/teams").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["teams"], serde_json::json!(["BOS", "MIA", "NYK"]));
    }

    #[tokio::test]
    async fn test_predict_response_shape() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&test_config(dir.path()), true);

        let (status, body) = get(app, "/v1/predict?home=knicks&away=BOS&date=2024-02-10").await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["home_team"], "NYK");
        assert_eq!(body["away_team"], "BOS");
        assert_eq!(body["as_of"], "2024-02-10");
        let prob = body["prob_home_win"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&prob));
        for key in ["delta_off", "delta_def", "delta_rest", "delta_elo"] {
            assert!(body["features"].get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test]
    async fn test_predict_error_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&test_config(dir.path()), true);

        let (status, body) = get(app.clone(), "/v1/predict?home=Gotham%20Rogues&away=BOS").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("Unknown team"));

        let (status, _) = get(app.clone(), "/v1/predict?home=NYK&away=BOS&date=2024-01-04").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = get(app, "/v1/predict?home=NYK&away=BOS&date=not-a-date").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("invalid date"));
    }

    #[tokio::test]
    async fn test_predict_without_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&test_config(dir.path()), false);

        let (status, _) = get(app, "/v1/predict?home=NYK&away=BOS").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
