//! API error type

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Flow evaluation failed (500)
    #[error(transparent)]
    Flow(#[from] recflow_core::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Flow(e) if e.is_structural() => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            ApiError::Flow(_) => (StatusCode::INTERNAL_SERVER_ERROR, "FLOW_ERROR"),
        };
        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn status_and_code(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        (status, json["error"]["code"].clone())
    }

    #[tokio::test]
    async fn test_error_status_codes() {
        let (status, code) = status_and_code(ApiError::BadRequest("empty seed".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "BAD_REQUEST");

        let structural = recflow_core::Error::Config("missing index_name".to_string());
        let (status, code) = status_and_code(structural.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "CONFIG_ERROR");

        let failed = recflow_core::Error::stage("similar", "index offline");
        let (status, code) = status_and_code(failed.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "FLOW_ERROR");
    }
}
