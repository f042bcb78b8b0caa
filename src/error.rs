use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::database::store::StoreError;
use crate::handlers::shared::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub reason: &'static str,
}

impl AppError {
    /// Machine-readable reason carried in every error body.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::StoreFailure(_) => "store_failure",
        }
    }

    pub fn shift_not_found() -> Self {
        AppError::NotFound("Shift not found".to_string())
    }

    pub fn incident_not_found() -> Self {
        AppError::NotFound("Incident not found".to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        if status_code.is_server_error() {
            log::error!(
                "Request failed with status {}: {}",
                status_code,
                error_message
            );
        } else {
            log::warn!(
                "Request rejected with status {}: {}",
                status_code,
                error_message
            );
        }

        let response_body = ApiResponse::error_with_data(
            ErrorDetail {
                reason: self.reason(),
            },
            &error_message,
        );

        HttpResponse::build(status_code).json(response_body)
    }
}
