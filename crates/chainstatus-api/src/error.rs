use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::gate::{GateResult, ProgressDetail};

/// Outcome class of an API call. Each code maps to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultCode {
    Ok,
    InvalidRequest,
    InsufficientIndexingProgress,
    ServiceUnavailable,
    InternalServerError,
}

impl ResultCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::InsufficientIndexingProgress | Self::ServiceUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    InvalidRequest(String),
    InsufficientIndexingProgress(ProgressDetail),
    ServiceUnavailable { detail: String, retryable: bool },
    InternalServerError(String),
}

impl ApiError {
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::InvalidRequest(_) => ResultCode::InvalidRequest,
            Self::InsufficientIndexingProgress(_) => ResultCode::InsufficientIndexingProgress,
            Self::ServiceUnavailable { .. } => ResultCode::ServiceUnavailable,
            Self::InternalServerError(_) => ResultCode::InternalServerError,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.result_code();
        let body = match self {
            ApiError::InvalidRequest(message) | ApiError::InternalServerError(message) => {
                serde_json::json!({ "resultCode": code, "message": message })
            }
            ApiError::ServiceUnavailable { detail, retryable } => {
                serde_json::json!({ "resultCode": code, "message": detail, "retryable": retryable })
            }
            ApiError::InsufficientIndexingProgress(detail) => {
                serde_json::json!({ "resultCode": code, "progress": detail })
            }
        };
        (code.status_code(), Json(body)).into_response()
    }
}

impl GateResult {
    /// The gated snapshot, or the error response explaining why not.
    pub fn into_result(
        self,
    ) -> Result<std::sync::Arc<chainstatus_core::OmnichainIndexingSnapshot>, ApiError> {
        match self {
            GateResult::Ok(snapshot) => Ok(snapshot),
            GateResult::InsufficientIndexingProgress(detail) => {
                Err(ApiError::InsufficientIndexingProgress(detail))
            }
            GateResult::ServiceUnavailable { detail, retryable } => {
                Err(ApiError::ServiceUnavailable { detail, retryable })
            }
            GateResult::InternalServerError(message) => Err(ApiError::InternalServerError(message)),
        }
    }
}

impl From<chainstatus_core::StatusError> for ApiError {
    fn from(value: chainstatus_core::StatusError) -> Self {
        if value.is_invalid_request() {
            Self::InvalidRequest(value.to_string())
        } else {
            Self::ServiceUnavailable {
                detail: value.to_string(),
                retryable: value.is_retryable(),
            }
        }
    }
}

impl From<chainstatus_cache::RegistryError> for ApiError {
    fn from(value: chainstatus_cache::RegistryError) -> Self {
        Self::InternalServerError(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes_map_to_fixed_statuses() {
        assert_eq!(ResultCode::Ok.status_code(), StatusCode::OK);
        assert_eq!(ResultCode::InvalidRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ResultCode::InsufficientIndexingProgress.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ResultCode::ServiceUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ResultCode::InternalServerError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_response_carries_result_code() {
        let response = ApiError::InvalidRequest("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
