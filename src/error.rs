use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::category::UNKNOWN_CATEGORY;
use crate::youtube::PlatformError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required query parameter: videoId")]
    MissingVideoId,
    #[error("Invalid query string: {0}")]
    InvalidQuery(String),
    #[error("YouTube API key is not configured on the server")]
    MissingApiKey,
    #[error("Google Cloud credentials are not configured on the server")]
    MissingCredentials,
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingVideoId | AppError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            AppError::MissingApiKey | AppError::MissingCredentials | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Platform(PlatformError::Upstream { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Platform(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::Platform(PlatformError::Upstream { details, .. }) => details.clone(),
            _ => None,
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    /// Category label resolved before the failure, or "Unknown"
    pub category: String,
}

/// An error together with the best category label known when it happened.
#[derive(Debug)]
pub struct ErrorResponse {
    pub error: AppError,
    pub category: String,
}

impl ErrorResponse {
    pub fn new(error: AppError, category: impl Into<String>) -> Self {
        Self {
            error,
            category: category.into(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.error.to_string(),
            details: self.error.details(),
            category: self.category.clone(),
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        ErrorResponse::new(error, UNKNOWN_CATEGORY)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.error.status();
        if status.is_server_error() {
            tracing::error!("❌ Request failed ({}): {}", status, self.error);
        } else {
            tracing::warn!("⚠️ Request rejected ({}): {}", status, self.error);
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::MissingVideoId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingApiKey.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::MissingCredentials.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let upstream = AppError::Platform(PlatformError::Upstream {
            status: 403,
            message: "forbidden".to_string(),
            details: None,
        });
        assert_eq!(upstream.status(), StatusCode::FORBIDDEN);

        let decode = AppError::Platform(PlatformError::Decode("bad".to_string()));
        assert_eq!(decode.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_body_carries_upstream_details() {
        let response = ErrorResponse::new(
            AppError::Platform(PlatformError::Upstream {
                status: 404,
                message: "Video not found.".to_string(),
                details: Some(json!([{ "reason": "videoNotFound" }])),
            }),
            "Music",
        );

        let body = serde_json::to_value(response.body()).unwrap();
        assert_eq!(
            body,
            json!({
                "error": "Video not found.",
                "details": [{ "reason": "videoNotFound" }],
                "category": "Music"
            })
        );
    }
}
