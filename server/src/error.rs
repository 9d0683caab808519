use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::derive::Display;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;
pub type AppJsonResult<T> = AppResult<Json<T>>;

#[derive(Debug, Display)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    #[display("Initial analysis is not completed yet")]
    UpstreamNotReady,
    #[display("Provider account has insufficient credits")]
    AccountExhausted,
    RequestTimeout,
    TooManyRequests,
    Configuration(String),
    Internal(anyhow::Error),
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(error)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        tracing::error!("Reqwest error: {:?}", error);
        match error.status() {
            Some(StatusCode::BAD_REQUEST) => AppError::BadRequest(error.to_string()),
            Some(StatusCode::NOT_FOUND) => AppError::NotFound(error.to_string()),
            Some(StatusCode::PAYMENT_REQUIRED) => AppError::AccountExhausted,
            Some(StatusCode::REQUEST_TIMEOUT) => AppError::RequestTimeout,
            Some(StatusCode::TOO_MANY_REQUESTS) => AppError::TooManyRequests,
            _ => AppError::Internal(error.into()),
        }
    }
}

// This centralizes all different errors from our app in one place
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": {
                    "code": StatusCode::BAD_REQUEST.as_u16(),
                    "message": error
                }})),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": {
                    "code": StatusCode::NOT_FOUND.as_u16(),
                    "message": msg
                }})),
            ),
            AppError::UpstreamNotReady => (
                StatusCode::CONFLICT,
                Json(json!({"error": {
                    "code": StatusCode::CONFLICT.as_u16(),
                    "message": "Initial analysis is not completed yet"
                }})),
            ),
            AppError::AccountExhausted => (
                StatusCode::PAYMENT_REQUIRED,
                Json(json!({"error": {
                    "code": StatusCode::PAYMENT_REQUIRED.as_u16(),
                    "message": "INSUFFICIENT_CREDITS_ERROR"
                }})),
            ),
            AppError::RequestTimeout => (
                StatusCode::REQUEST_TIMEOUT,
                Json(json!({"error": {
                    "code": StatusCode::REQUEST_TIMEOUT.as_u16(),
                    "message": "Request took too long"
                }})),
            ),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"error": {
                    "code": StatusCode::TOO_MANY_REQUESTS.as_u16(),
                    "message": "Too many requests"
                }})),
            ),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": {
                        "code": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                        "message": "Server misconfiguration"
                    }})),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": {
                        "code": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                        "message": "Internal server error"
                    }})),
                )
            }
        };

        err.into_response()
    }
}
