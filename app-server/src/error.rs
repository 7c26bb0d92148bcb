//! Mapping of recommender errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jdrec_retrieval::RecommendError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// JSON body of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,

    /// Set when a save succeeded but the index could not be rebuilt.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stale_index: bool,
}

/// An error response with a human-readable `detail`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                detail: detail.into(),
                stale_index: false,
            },
        }
    }
}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        let status = match &err {
            RecommendError::InvalidRecord(_) | RecommendError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let stale_index = matches!(err, RecommendError::StaleIndex { .. });

        let mut api_error = Self::new(status, err.to_string());
        api_error.body.stale_index = stale_index;
        api_error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.body.detail);
        }
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_stale_index_is_flagged() {
        let err = RecommendError::StaleIndex {
            source: Box::new(RecommendError::CorpusNotFound("jds.json".into())),
        };

        let (status, body) = body_json(err.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["stale_index"], serde_json::json!(true));
        assert!(body["detail"].as_str().unwrap().contains("jds.json"));
    }

    #[tokio::test]
    async fn test_plain_errors_omit_stale_flag() {
        let (status, body) =
            body_json(RecommendError::InvalidRequest("k must be at least 1".into()).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({"detail": "invalid request: k must be at least 1"})
        );
    }
}
