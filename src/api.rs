//! HTTP surface for Knowledge Relay.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /upload-doc` – Index one multipart `file` (`.pdf`, `.txt`, `.md`, `.docx`) into the
//!   configured vector store. Returns the completed file count and the provider batch id.
//! - `POST /manychat-agent` – Relay `{"user_input": ...}` to the configured agent on a fresh
//!   thread and return `{"messages": [{"text": ...}]}`.
//! - `GET /health` – Liveness probe.
//! - `GET /metrics` – Relay counters since startup.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Failures on the two relay endpoints are rendered as `{"detail": ...}` by
//! [`RelayError`](crate::relay::RelayError).

use crate::config::Config;
use crate::metrics::{MetricsSnapshot, RelayMetrics};
use crate::platform::AssistantPlatform;
use crate::relay::{
    IngestOutcome, RelayError, Upload, ingest_document, parse_question, relay_question,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::BytesRejection,
    },
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Success message returned by `POST /upload-doc`.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "Archivo procesado exitosamente";

/// Shared handles passed to every handler.
struct AppState<P> {
    config: Arc<Config>,
    platform: Arc<P>,
    metrics: Arc<RelayMetrics>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            platform: Arc::clone(&self.platform),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Build the HTTP router exposing the relay API surface.
pub fn create_router<P>(config: Arc<Config>, platform: Arc<P>) -> Router
where
    P: AssistantPlatform + 'static,
{
    let upload_limit = config.max_upload_bytes;
    let state = AppState {
        config,
        platform,
        metrics: Arc::new(RelayMetrics::new()),
    };

    Router::new()
        .route(
            "/upload-doc",
            post(upload_document::<P>).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/manychat-agent", post(manychat_agent::<P>))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<P>))
        .route("/commands", get(get_commands))
        .with_state(state)
}

/// Success response for `POST /upload-doc`.
#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    #[serde(rename = "detalles")]
    details: UploadDetails,
}

#[derive(Serialize)]
struct UploadDetails {
    /// Files the provider reports as indexed.
    #[serde(rename = "archivos_subidos")]
    files_uploaded: u64,
    /// Provider batch identifier.
    #[serde(rename = "lote_id")]
    batch_id: String,
}

/// Index an uploaded document into the vector store.
async fn upload_document<P>(
    State(state): State<AppState<P>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, RelayError>
where
    P: AssistantPlatform + 'static,
{
    let span = tracing::info_span!("upload_doc", request_id = %Uuid::new_v4());
    async move {
        let result: Result<IngestOutcome, RelayError> = async {
            let multipart = multipart.map_err(|rejection| {
                tracing::debug!(error = %rejection, "Upload body is not multipart");
                RelayError::MissingFile
            })?;
            let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
            ingest_document(state.platform.as_ref(), &state.config, upload).await
        }
        .await;

        match result {
            Ok(outcome) => {
                state.metrics.record_ingest();
                Ok(Json(UploadResponse {
                    message: UPLOAD_SUCCESS_MESSAGE,
                    details: UploadDetails {
                        files_uploaded: outcome.files_completed,
                        batch_id: outcome.batch_id,
                    },
                }))
            }
            Err(err) => {
                tracing::warn!(error = %err, status = %err.status(), "Upload request failed");
                state.metrics.record_ingest_failure();
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}

/// Pull the `file` part out of the multipart stream.
async fn read_upload(mut multipart: Multipart, limit: usize) -> Result<Upload, RelayError> {
    let read_error = |err: MultipartError| multipart_failure(err, limit);
    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or(RelayError::MissingFile)?;
        let bytes = field.bytes().await.map_err(read_error)?;
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(RelayError::MissingFile)
}

fn multipart_failure(err: MultipartError, limit: usize) -> RelayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::Internal(format!("upload exceeds the {limit} byte limit"))
    } else {
        RelayError::Internal(err.body_text())
    }
}

/// Success response for `POST /manychat-agent`.
#[derive(Serialize)]
struct ChatResponse {
    messages: Vec<ReplyMessage>,
}

#[derive(Serialize)]
struct ReplyMessage {
    text: String,
}

/// Relay a question to the agent. The raw body is parsed here so malformed JSON and unreadable
/// bodies follow the same `{"detail"}` error path as every other failure.
async fn manychat_agent<P>(
    State(state): State<AppState<P>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatResponse>, RelayError>
where
    P: AssistantPlatform + 'static,
{
    let span = tracing::info_span!("manychat_agent", request_id = %Uuid::new_v4());
    async move {
        let result: Result<String, RelayError> = async {
            let body = body.map_err(|rejection| RelayError::Internal(rejection.body_text()))?;
            let question = parse_question(&body)?;
            relay_question(state.platform.as_ref(), &state.config, &question).await
        }
        .await;

        match result {
            Ok(text) => {
                state.metrics.record_reply();
                Ok(Json(ChatResponse {
                    messages: vec![ReplyMessage { text }],
                }))
            }
            Err(err) => {
                tracing::error!(error = %err, status = %err.status(), "Error in manychat-agent");
                state.metrics.record_relay_failure();
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Return the relay counters.
async fn get_metrics<P>(State(state): State<AppState<P>>) -> Json<MetricsSnapshot>
where
    P: AssistantPlatform + 'static,
{
    Json(state.metrics.snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload_doc",
                method: "POST",
                path: "/upload-doc",
                description: "Upload one document (multipart field `file`; .pdf, .txt, .md, .docx) into the vector store. Response returns { \"message\": string, \"detalles\": { \"archivos_subidos\": number, \"lote_id\": string } }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "manychat_agent",
                method: "POST",
                path: "/manychat-agent",
                description: "Ask the knowledge agent a question on a fresh thread. Response returns { \"messages\": [{ \"text\": string }] }.",
                request_example: Some(json!({ "user_input": "What are your opening hours?" })),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion and relay counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}
