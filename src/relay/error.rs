//! Failure taxonomy shared by both handlers and its HTTP mapping.

use crate::platform::ProviderError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to callers of the relay endpoints.
///
/// Every variant renders as `{"detail": <message>}` with the status from [`RelayError::status`].
#[derive(Debug, Error)]
pub enum RelayError {
    /// Uploaded filename is outside the extension allow-list.
    #[error("Formato de archivo no compatible")]
    UnsupportedFormat(String),
    /// Multipart body carried no `file` part with a filename.
    #[error("No se recibió ningún archivo")]
    MissingFile,
    /// Chat body had no usable `user_input`.
    #[error("No se recibió 'user_input' válido")]
    MissingInput,
    /// Vector store batch settled in a status other than `completed`.
    #[error("Error en procesamiento: {0}")]
    ProcessingFailed(String),
    /// Agent run settled in a status other than `completed`.
    #[error("Error del agente: {0}")]
    AgentFailed(String),
    /// Run completed without any assistant text.
    #[error("El agente no devolvió ninguna respuesta")]
    NoReply,
    /// Transport, provider, filesystem, or decoding failure.
    #[error("Error interno: {0}")]
    Internal(String),
}

impl RelayError {
    /// HTTP status code reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedFormat(_) | Self::MissingFile | Self::MissingInput => {
                StatusCode::BAD_REQUEST
            }
            Self::ProcessingFailed(_) | Self::AgentFailed(_) | Self::NoReply | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<ProviderError> for RelayError {
    fn from(inner: ProviderError) -> Self {
        Self::Internal(inner.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(inner: std::io::Error) -> Self {
        Self::Internal(inner.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(
            RelayError::UnsupportedFormat("a.exe".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RelayError::MissingInput.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::AgentFailed("expired".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn response_body_carries_detail() {
        let response = RelayError::ProcessingFailed("failed".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json, json!({ "detail": "Error en procesamiento: failed" }));
    }

    #[test]
    fn provider_errors_become_internal() {
        let err: RelayError = ProviderError::InvalidPath("/".into()).into();
        assert!(matches!(err, RelayError::Internal(ref message) if message.contains("no file name")));
    }
}
