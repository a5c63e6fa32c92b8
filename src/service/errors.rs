//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use serde_json::json;

use crate::PredictorError;

/// Error returned by handlers, rendered as `{"detail": ...}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<PredictorError> for ApiError {
    fn from(err: PredictorError) -> Self {
        let status = match &err {
            PredictorError::UnknownTeam(_)
            | PredictorError::InsufficientHistory { .. }
            | PredictorError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PredictorError::NoModel => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}: {}", self.status, self.detail);
        } else {
            warn!("{}: {}", self.status, self.detail);
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PredictorError::UnknownTeam("XYZ".into()), 422),
            (
                PredictorError::InsufficientHistory {
                    team: "NYK".into(),
                    games: 2,
                    required: 3,
                },
                422,
            ),
            (PredictorError::NoModel, 503),
            (PredictorError::Model("broken record".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status.as_u16(), status);
        }
        assert_eq!(ApiError::bad_request("bad date").status, StatusCode::BAD_REQUEST);
    }
}
