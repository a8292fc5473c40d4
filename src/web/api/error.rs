use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::PredictError;

pub enum ApiError {
    Validation(String),
    NotFound(&'static str),
    Predict(PredictError),
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::InvalidInput(msg) => ApiError::Validation(msg),
            _ => ApiError::Predict(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_message("validation_failed", &msg)),
            )
                .into_response(),
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new(what))).into_response()
            }
            ApiError::Predict(e) => {
                if e.is_expected() {
                    log::info!("{}", e);
                } else {
                    log::warn!("Prediction failed: {}", e);
                }
                let (status, error) = match &e {
                    PredictError::TleUnavailable(_) | PredictError::FileRead(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "tle_unavailable")
                    }
                    PredictError::MalformedTle(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "malformed_tle")
                    }
                    PredictError::NoPassInHorizon { .. } => (StatusCode::NOT_FOUND, "no_pass"),
                    PredictError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
                    PredictError::PropagationDegenerate(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "propagation_failed")
                    }
                };
                (status, Json(ErrorResponse::with_message(error, &e.to_string()))).into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}
