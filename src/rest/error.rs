//! API error types and responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::WizardError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Wizard or step not found
    NotFound(String),
    /// Malformed request (identity headers, form body)
    BadRequest(String),
    /// Misconfiguration or storage failure
    InternalError(String),
}

/// Error response body
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::StepNotFound(_) => ApiError::NotFound(err.to_string()),
            other => {
                tracing::error!(error = %other, "wizard request failed");
                ApiError::InternalError(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_not_found_response() {
        let error = ApiError::NotFound("Wizard 'nope' not found".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.error, "not_found");
        assert_eq!(json.message, "Wizard 'nope' not found");
    }

    #[tokio::test]
    async fn test_bad_request_response() {
        let response = ApiError::BadRequest("bad x-user-id".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_wizard_errors_map_to_status() {
        let not_found = ApiError::from(WizardError::StepNotFound("3".to_string()));
        assert!(matches!(not_found, ApiError::NotFound(_)));

        let invalid = ApiError::from(WizardError::invalid("Wizard [X] does not contain any steps."));
        assert!(matches!(invalid, ApiError::InternalError(_)));

        let corrupt = ApiError::from(WizardError::CorruptDocument("[]".to_string()));
        assert!(matches!(corrupt, ApiError::InternalError(_)));
    }
}
