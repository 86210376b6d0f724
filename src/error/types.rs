use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::middleware::current_request_id;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("File too large: uploads are limited to {limit}MB")]
    FileTooLarge { limit: usize },

    #[error("Invalid file format: {message}")]
    InvalidFile { message: String },

    #[error("Missing or invalid content type")]
    InvalidContentType,

    #[error("Missing file in request")]
    MissingFile,

    #[error("No text could be extracted from the PDF.")]
    ExtractionFailed,

    #[error("PDF processing failed: {message}")]
    ProcessingError { message: String },

    #[error("Error while generating the summary: {message}")]
    SummarizationFailed { message: String },
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AppError::InvalidFile { .. } => "INVALID_FILE",
            AppError::InvalidContentType => "INVALID_CONTENT_TYPE",
            AppError::MissingFile => "MISSING_FILE",
            AppError::ExtractionFailed => "EXTRACTION_FAILED",
            AppError::ProcessingError { .. } => "PROCESSING_ERROR",
            AppError::SummarizationFailed { .. } => "SUMMARIZATION_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InvalidFile { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidContentType => StatusCode::BAD_REQUEST,
            AppError::MissingFile => StatusCode::BAD_REQUEST,
            AppError::ExtractionFailed => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ProcessingError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SummarizationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();
        let request_id = current_request_id().unwrap_or_else(|| Uuid::new_v4().to_string());
        let timestamp = chrono::Utc::now().to_rfc3339();

        tracing::error!(
            error_code = error_code,
            status_code = %status,
            request_id = %request_id,
            error_message = %message,
            "API error occurred"
        );

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
                "request_id": request_id,
                "timestamp": timestamp
            },
            "data": null
        }));

        (status, body).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::SummarizationFailed {
            message: format!("worker task aborted: {}", err),
        }
    }
}

impl AppError {
    pub fn processing(message: impl Into<String>) -> Self {
        AppError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn summarization(message: impl Into<String>) -> Self {
        AppError::SummarizationFailed {
            message: message.into(),
        }
    }
}
