use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use bytes::Bytes;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::request_id;
use crate::models::{ChunkCounts, ProcessedFile, SummarizeData, SummarizeResponse};
use crate::services::{process_document, DocumentSummary};

pub async fn summarize_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<Json<SummarizeResponse>> {
    let start = Instant::now();
    let request_id = request_id(&headers);

    info!(request_id = %request_id, "Starting PDF summarization request");

    let limit_mb = state.config.max_file_size_mb;
    let file = match extract_file_from_multipart(&mut multipart, limit_mb).await {
        Ok(file) => {
            info!(
                request_id = %request_id,
                file_name = %file.name,
                file_size = file.size,
                "File extracted from multipart form"
            );
            file
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Failed to extract file from multipart");
            return Err(e);
        }
    };

    run_pipeline(&state, &request_id, file, start).await
}

async fn extract_file_from_multipart(
    multipart: &mut Multipart,
    limit_mb: usize,
) -> AppResult<ProcessedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to read multipart field", limit_mb))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("unknown.pdf").to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "Failed to read file data", limit_mb))?;

        if data.is_empty() {
            return Err(AppError::InvalidFile {
                message: "File is empty".to_string(),
            });
        }

        let mut file = ProcessedFile::new(file_name, data);
        // browsers send octet-stream for files they cannot classify
        if let Some(mime_type) = content_type.filter(|ct| ct != "application/octet-stream") {
            file = file.with_mime_type(mime_type);
        }

        if !file.is_pdf() {
            return Err(AppError::InvalidFile {
                message: "File is not a valid PDF document".to_string(),
            });
        }

        debug!(
            "Extracted file: {} ({} bytes, type: {:?})",
            file.name,
            file.size,
            file.mime_type
        );

        return Ok(file);
    }

    Err(AppError::MissingFile)
}

/// The body limit surfaces as a multipart read error; report it as such.
fn multipart_error(err: MultipartError, context: &str, limit_mb: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::FileTooLarge { limit: limit_mb };
    }
    AppError::InvalidFile {
        message: format!("{}: {}", context, err),
    }
}

/// Direct binary upload with `Content-Type: application/pdf`.
pub async fn summarize_binary_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<SummarizeResponse>> {
    let start = Instant::now();
    let request_id = request_id(&headers);

    info!(request_id = %request_id, "Starting binary PDF summarization request");

    let content_type = headers
        .get("content-type")
        .and_then(|ct| ct.to_str().ok())
        .unwrap_or("");

    if !content_type.contains("application/pdf") {
        warn!(
            request_id = %request_id,
            content_type = content_type,
            "Invalid content type for binary upload"
        );
        return Err(AppError::InvalidContentType);
    }

    if body.is_empty() {
        warn!(request_id = %request_id, "Empty body received");
        return Err(AppError::MissingFile);
    }

    let file = ProcessedFile::new("uploaded.pdf".to_string(), body)
        .with_mime_type("application/pdf".to_string());

    run_pipeline(&state, &request_id, file, start).await
}

async fn run_pipeline(
    state: &AppState,
    request_id: &str,
    file: ProcessedFile,
    start: Instant,
) -> AppResult<Json<SummarizeResponse>> {
    let limit = state.config.max_file_size_bytes();
    if file.size > limit {
        warn!(
            request_id = %request_id,
            file_size = file.size,
            max_size = limit,
            "File size exceeds limit"
        );
        return Err(AppError::FileTooLarge {
            limit: state.config.max_file_size_mb,
        });
    }

    let config = state.config.clone();
    let models = state.models.clone();
    let outcome = tokio::task::spawn_blocking(move || process_document(file, &config, &models)).await?;

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            error!(request_id = %request_id, error = %e, "PDF summarization failed");
            return Err(e);
        }
    };

    let total_time = start.elapsed().as_millis() as u64;
    info!(
        request_id = %request_id,
        total_time_ms = total_time,
        status = ?summary.report.status(),
        "Request completed successfully"
    );

    Ok(Json(SummarizeResponse::new(into_data(summary), total_time)))
}

fn into_data(summary: DocumentSummary) -> SummarizeData {
    SummarizeData {
        file_name: summary.file_name,
        pages: summary.pages,
        metadata: summary.metadata,
        preview: summary.preview,
        summary: summary.report.display_text(),
        chunks: ChunkCounts::from(&summary.report),
        chunk_reports: summary.report.chunks,
    }
}
