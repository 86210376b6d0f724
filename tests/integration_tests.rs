//! Integration tests for the Synopsis PDF summarizer

mod common;

use std::env;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use synopsis::{
    config::Config,
    error::AppError,
    handlers::{create_router, AppState},
    models::ProcessedFile,
    services::{process_document, ModelCache, PdfProcessor, FALLBACK_SUMMARY},
};

use common::{build_pdf, words, CountingLoader};

const BOUNDARY: &str = "synopsis-test-boundary";

fn multipart_body(file_name: &str, content_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(file_name: &str, content_type: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/summarize")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(file_name, content_type, content)))
        .unwrap()
}

fn router_with(loader: CountingLoader) -> Router {
    create_router(AppState::new(Config::default(), ModelCache::new(loader)))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_config_loading() {
    // The only test in this binary that touches the environment.
    env::set_var("SERVER_HOST", "0.0.0.0");
    env::set_var("SERVER_PORT", "9090");
    env::set_var("CHUNK_MAX_WORDS", "300");
    env::set_var("CHUNK_MIN_WORDS", "not-a-number");
    env::set_var("SUMMARY_MAX_TOKENS", "256");
    env::set_var("EARLY_STOPPING", "false");

    let config = Config::from_env().unwrap();
    assert_eq!(config.server_host, "0.0.0.0");
    assert_eq!(config.server_port, 9090);
    assert_eq!(config.chunk_max_words, 300);
    // unparsable values fall back to the default
    assert_eq!(config.chunk_min_words, 50);
    assert_eq!(config.max_summary_tokens, Some(256));
    assert!(!config.early_stopping);
    assert_eq!(config.generation().max_length, 256);

    for var in [
        "SERVER_HOST",
        "SERVER_PORT",
        "CHUNK_MAX_WORDS",
        "CHUNK_MIN_WORDS",
        "SUMMARY_MAX_TOKENS",
        "EARLY_STOPPING",
    ] {
        env::remove_var(var);
    }
}

#[test]
fn test_extractor_concatenates_pages_in_order() {
    let pdf = build_pdf(&["First page text", "", "Second page text"], None);
    let file = ProcessedFile::new("doc.pdf".to_string(), pdf.into());

    let result = PdfProcessor::new().extract_text(&file).unwrap();

    assert_eq!(result.pages, 3);
    assert!(result.text.ends_with('\n'));
    let lines: Vec<&str> = result
        .text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    assert_eq!(lines, vec!["First page text", "Second page text"]);
}

#[test]
fn test_extractor_reads_document_info() {
    let pdf = build_pdf(&["Body"], Some("Quarterly Report"));
    let file = ProcessedFile::new("doc.pdf".to_string(), pdf.into());

    let result = PdfProcessor::new().extract_text(&file).unwrap();

    assert_eq!(result.metadata.title.as_deref(), Some("Quarterly Report"));
    assert_eq!(result.metadata.author.as_deref(), Some("Jane Analyst"));
    assert_eq!(result.metadata.file_size_bytes, file.size);
}

#[test]
fn test_extractor_returns_empty_text_for_image_only_pages() {
    let pdf = build_pdf(&["", ""], None);
    let file = ProcessedFile::new("scan.pdf".to_string(), pdf.into());

    let result = PdfProcessor::new().extract_text(&file).unwrap();

    assert!(result.is_empty());
    assert_eq!(result.pages, 2);
}

#[test]
fn test_model_cache_returns_identical_instance() {
    let loader = CountingLoader::default();
    let cache = ModelCache::new(loader.clone());
    assert!(!cache.is_loaded());

    let first = cache.get_or_load().unwrap();
    let second = cache.get_or_load().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.load_count(), 1);
    assert!(cache.is_loaded());
}

#[test]
fn test_model_cache_does_not_keep_failed_loads() {
    let loader = CountingLoader::failing();
    let cache = ModelCache::new(loader.clone());

    let err = cache.get_or_load().err().unwrap();
    assert!(matches!(err, AppError::SummarizationFailed { .. }));
    assert!(err.to_string().contains("weights not found"));
    assert!(cache.get_or_load().is_err());

    assert_eq!(loader.load_count(), 2);
    assert!(!cache.is_loaded());
}

#[test]
fn test_pipeline_does_not_load_model_for_empty_document() {
    let loader = CountingLoader::default();
    let cache = ModelCache::new(loader.clone());
    let file = ProcessedFile::new("scan.pdf".to_string(), build_pdf(&[""], None).into());

    let err = process_document(file, &Config::default(), &cache).unwrap_err();

    assert!(matches!(err, AppError::ExtractionFailed));
    assert_eq!(loader.load_count(), 0);
}

#[test]
fn test_pipeline_summarizes_every_page() {
    let loader = CountingLoader::default();
    let cache = ModelCache::new(loader.clone());
    let pdf = build_pdf(&[words("alpha", 120).as_str(), words("beta", 150).as_str()], None);
    let file = ProcessedFile::new("doc.pdf".to_string(), pdf.into());

    let summary = process_document(file, &Config::default(), &cache).unwrap();

    assert_eq!(summary.pages, 2);
    assert!(summary.preview.starts_with("alpha0 alpha1"));
    assert!(summary.preview.ends_with("..."));
    // 270 words: alpha0..beta79 fill the first window, beta80.. the second
    assert_eq!(summary.report.chunks.len(), 2);
    assert_eq!(
        summary.report.display_text(),
        "summary of alpha0 summary of beta80"
    );
    assert_eq!(loader.load_count(), 1);
}

#[tokio::test]
async fn test_summarize_endpoint_returns_summary() {
    let loader = CountingLoader::default();
    let app = router_with(loader.clone());
    let pdf = build_pdf(&[words("word", 80).as_str()], Some("Notes"));

    let response = app
        .oneshot(upload_request("notes.pdf", "application/pdf", &pdf))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["file_name"], "notes.pdf");
    assert_eq!(body["data"]["pages"], 1);
    assert_eq!(body["data"]["metadata"]["title"], "Notes");
    assert_eq!(body["data"]["summary"], "summary of word0");
    assert_eq!(body["data"]["chunks"]["total"], 1);
    assert_eq!(body["data"]["chunks"]["summarized"], 1);
    assert_eq!(body["data"]["chunk_reports"][0]["status"], "summarized");
    assert!(body["data"]["preview"].as_str().unwrap().ends_with("..."));
}

#[tokio::test]
async fn test_summarize_endpoint_reports_fallback_for_short_text() {
    let app = router_with(CountingLoader::default());
    let pdf = build_pdf(&[words("word", 20).as_str()], None);

    let response = app
        .oneshot(upload_request("short.pdf", "application/pdf", &pdf))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["summary"], FALLBACK_SUMMARY);
    assert_eq!(body["data"]["chunks"]["skipped"], 1);
    assert_eq!(body["data"]["chunk_reports"][0]["status"], "skipped");
}

#[tokio::test]
async fn test_summarize_endpoint_rejects_empty_extraction() {
    let loader = CountingLoader::default();
    let app = router_with(loader.clone());
    let pdf = build_pdf(&["", ""], None);

    let response = app
        .oneshot(upload_request("scan.pdf", "application/pdf", &pdf))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "EXTRACTION_FAILED");
    assert_eq!(loader.load_count(), 0);
}

#[tokio::test]
async fn test_summarize_endpoint_surfaces_model_failure() {
    let app = router_with(CountingLoader::failing());
    let pdf = build_pdf(&[words("word", 80).as_str()], None);

    let response = app
        .oneshot(upload_request("doc.pdf", "application/pdf", &pdf))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let header_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "SUMMARIZATION_ERROR");
    assert_eq!(body["error"]["request_id"], header_id);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Error while generating the summary:"));
    assert!(message.contains("weights not found"));
}

#[tokio::test]
async fn test_summarize_endpoint_rejects_non_pdf() {
    let app = router_with(CountingLoader::default());

    let response = app
        .oneshot(upload_request("notes.txt", "text/plain", b"just text"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_FILE");
}

#[tokio::test]
async fn test_summarize_endpoint_rejects_oversized_upload() {
    let config = Config {
        max_file_size_mb: 1,
        ..Config::default()
    };
    let loader = CountingLoader::default();
    let app = create_router(AppState::new(config, ModelCache::new(loader.clone())));

    let mut content = b"%PDF-1.5\n".to_vec();
    content.resize(2 * 1024 * 1024, b'x');
    let response = app
        .oneshot(upload_request("huge.pdf", "application/pdf", &content))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let header_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "FILE_TOO_LARGE");
    assert_eq!(body["error"]["message"], "File too large: uploads are limited to 1MB");
    assert_eq!(body["error"]["request_id"], header_id);
    assert_eq!(loader.load_count(), 0);
}

#[tokio::test]
async fn test_binary_endpoint_requires_pdf_content_type() {
    let app = router_with(CountingLoader::default());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/summarize/binary")
        .header("content-type", "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_CONTENT_TYPE");
}

#[tokio::test]
async fn test_binary_endpoint_summarizes_pdf() {
    let app = router_with(CountingLoader::default());
    let pdf = build_pdf(&[words("word", 60).as_str()], None);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/summarize/binary")
        .header("content-type", "application/pdf")
        .body(Body::from(pdf))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["file_name"], "uploaded.pdf");
    assert_eq!(body["data"]["summary"], "summary of word0");
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let app = router_with(CountingLoader::default());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"]["id"], "test/echo");
    assert_eq!(body["model"]["loaded"], false);
}

#[tokio::test]
async fn test_index_serves_upload_form() {
    let app = router_with(CountingLoader::default());

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("accept=\"application/pdf,.pdf\""));
    assert!(html.contains("/api/v1/summarize"));
}
