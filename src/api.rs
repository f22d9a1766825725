//! HTTP surface for ragserve.
//!
//! A compact Axum router with three endpoints:
//!
//! - `POST /api/rag/ask` – multipart upload (`document` file + `query` field);
//!   extracts the document's text and answers the question against it.
//! - `POST /api/rag/summarize` – multipart upload (`document` file); returns a
//!   structured summary of the document.
//! - `GET /metrics` – request counters for observability.
//!
//! Uploads are parsed fully in memory; malformed requests and unsupported
//! file formats map to `400`, a missing provider credential to `503`, and
//! upstream LLM failures to `502`.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::llm::LlmError;
use crate::metrics::MetricsSnapshot;
use crate::service::{DocQaApi, DocumentUpload, ServiceError};

/// Build the HTTP router exposing the document QA surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DocQaApi + 'static,
{
    Router::new()
        .route("/api/rag/ask", post(ask_document::<S>))
        .route("/api/rag/summarize", post(summarize_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Success response for `POST /api/rag/ask`.
#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

/// Success response for `POST /api/rag/summarize`.
#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
}

/// Parts accepted by the upload endpoints.
#[derive(Default)]
struct UploadForm {
    document: Option<DocumentUpload>,
    query: Option<String>,
}

/// Drain a multipart stream into the named parts the endpoints understand.
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("Malformed multipart body: {err}")))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("document") => {
                let filename = field
                    .file_name()
                    .map(ToString::to_string)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| AppError::bad_request("File and query are required."))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(format!("Failed to read upload: {err}")))?;
                form.document = Some(DocumentUpload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some("query") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("Failed to read query: {err}")))?;
                form.query = Some(value);
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Answer a question against an uploaded document.
async fn ask_document<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<AskResponse>, AppError>
where
    S: DocQaApi,
{
    let form = read_upload_form(multipart).await?;
    let document = form.document.ok_or_else(|| {
        AppError::bad_request("No document file part ('document') in the request.")
    })?;
    let query = form.query.unwrap_or_default();

    let answer = service.ask(document, &query).await?;
    Ok(Json(AskResponse { answer }))
}

/// Summarize an uploaded document.
async fn summarize_document<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: DocQaApi,
{
    let form = read_upload_form(multipart).await?;
    let document = form.document.ok_or_else(|| {
        AppError::bad_request("No document file part ('document') in the request.")
    })?;

    let summary = service.summarize(document).await?;
    Ok(Json(SummarizeResponse { summary }))
}

/// Return a concise metrics snapshot with request counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DocQaApi,
{
    Json(service.metrics_snapshot())
}

/// Error envelope rendered as `{"message": ...}` with a mapped status code.
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(inner: ServiceError) -> Self {
        let status = match &inner {
            ServiceError::BadRequest(_) | ServiceError::Extract(_) => StatusCode::BAD_REQUEST,
            ServiceError::Llm(LlmError::ProviderUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Llm(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: inner.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{DocQaApi, DocumentUpload, ServiceError};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    const BOUNDARY: &str = "ragserve-test-boundary";

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> (String, String) {
        let mut body = String::new();
        for (name, filename, contents) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(contents);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        (
            format!("multipart/form-data; boundary={BOUNDARY}"),
            body,
        )
    }

    #[derive(Clone, Debug)]
    struct AskCall {
        filename: String,
        query: String,
    }

    struct StubDocQaService {
        asks: Mutex<Vec<AskCall>>,
        fail_with_timeout: bool,
    }

    impl StubDocQaService {
        fn new() -> Self {
            Self {
                asks: Mutex::new(Vec::new()),
                fail_with_timeout: false,
            }
        }

        fn timing_out() -> Self {
            Self {
                asks: Mutex::new(Vec::new()),
                fail_with_timeout: true,
            }
        }
    }

    #[async_trait]
    impl DocQaApi for StubDocQaService {
        async fn ask(
            &self,
            upload: DocumentUpload,
            query: &str,
        ) -> Result<String, ServiceError> {
            if self.fail_with_timeout {
                return Err(ServiceError::Llm(crate::llm::LlmError::Timeout(60)));
            }
            self.asks.lock().unwrap().push(AskCall {
                filename: upload.filename,
                query: query.to_string(),
            });
            Ok("stub answer".to_string())
        }

        async fn summarize(&self, _upload: DocumentUpload) -> Result<String, ServiceError> {
            Ok("stub summary".to_string())
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                questions_answered: 7,
                documents_summarized: 2,
                extraction_failures: 0,
            }
        }
    }

    async fn send(
        app: Router,
        uri: &str,
        content_type: &str,
        body: String,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&bytes).expect("json body");
        (status, json)
    }

    #[tokio::test]
    async fn ask_route_returns_answer_json() {
        let service = Arc::new(StubDocQaService::new());
        let app = create_router(service.clone());
        let (content_type, body) = multipart_body(&[
            ("document", Some("notes.txt"), "tuesday standup at nine"),
            ("query", None, "When is standup?"),
        ]);

        let (status, json) = send(app, "/api/rag/ask", &content_type, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], "stub answer");

        let asks = service.asks.lock().unwrap();
        assert_eq!(asks.len(), 1);
        assert_eq!(asks[0].filename, "notes.txt");
        assert_eq!(asks[0].query, "When is standup?");
    }

    #[tokio::test]
    async fn missing_document_part_is_400() {
        let app = create_router(Arc::new(StubDocQaService::new()));
        let (content_type, body) = multipart_body(&[("query", None, "Where?")]);

        let (status, json) = send(app, "/api/rag/ask", &content_type, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["message"]
                .as_str()
                .expect("message string")
                .contains("document")
        );
    }

    #[tokio::test]
    async fn summarize_route_returns_summary_json() {
        let app = create_router(Arc::new(StubDocQaService::new()));
        let (content_type, body) =
            multipart_body(&[("document", Some("report.txt"), "quarterly numbers")]);

        let (status, json) = send(app, "/api/rag/summarize", &content_type, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"], "stub summary");
    }

    #[tokio::test]
    async fn llm_timeout_maps_to_bad_gateway() {
        let app = create_router(Arc::new(StubDocQaService::timing_out()));
        let (content_type, body) = multipart_body(&[
            ("document", Some("notes.txt"), "contents"),
            ("query", None, "anything"),
        ]);

        let (status, _json) = send(app, "/api/rag/ask", &content_type, body).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn metrics_route_reports_counters() {
        let app = create_router(Arc::new(StubDocQaService::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["questions_answered"], 7);
        assert_eq!(json["documents_summarized"], 2);
    }
}
