//! Shared types used by the assistant platform client and its fakes.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Batch status reported once every file in the batch has been indexed.
pub const BATCH_COMPLETED: &str = "completed";
/// Batch status reported while files are still being indexed.
pub const BATCH_IN_PROGRESS: &str = "in_progress";
/// Run status reported when the agent finished answering.
pub const RUN_COMPLETED: &str = "completed";
/// Run statuses that are still moving towards a terminal state.
pub const RUN_PENDING: [&str; 3] = ["queued", "in_progress", "cancelling"];

/// Errors returned while interacting with the assistant platform.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response, or the body could not be decoded.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected provider response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A polled resource did not settle before the configured deadline.
    #[error("Timed out after {waited:?} waiting for {resource} {id}")]
    PollTimeout {
        /// Kind of resource being polled.
        resource: &'static str,
        /// Provider identifier of the resource.
        id: String,
        /// Time spent polling before giving up.
        waited: Duration,
    },
    /// Local file could not be read for upload.
    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    /// Local path has no usable file name.
    #[error("Upload path has no file name: {0}")]
    InvalidPath(String),
}

/// Per-state file counters of a vector store batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct FileCounts {
    /// Files still being processed.
    #[serde(default)]
    pub in_progress: u64,
    /// Files indexed successfully.
    #[serde(default)]
    pub completed: u64,
    /// Files that failed to index.
    #[serde(default)]
    pub failed: u64,
    /// Files cancelled before indexing finished.
    #[serde(default)]
    pub cancelled: u64,
    /// Total number of files in the batch.
    #[serde(default)]
    pub total: u64,
}

/// Vector store file batch as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileBatch {
    /// Provider-assigned batch identifier.
    pub id: String,
    /// Raw status string (`in_progress`, `completed`, `cancelled`, `failed`).
    pub status: String,
    /// Per-state file counters.
    #[serde(default)]
    pub file_counts: FileCounts,
}

impl FileBatch {
    /// Whether every file in the batch was indexed.
    pub fn is_completed(&self) -> bool {
        self.status == BATCH_COMPLETED
    }

    /// Whether the batch reached a terminal status.
    pub fn is_settled(&self) -> bool {
        self.status != BATCH_IN_PROGRESS
    }
}

/// Conversation thread handle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thread {
    /// Provider-assigned thread identifier.
    pub id: String,
}

/// Failure details attached to an unsuccessful run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunError {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
}

/// Agent run as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Run {
    /// Provider-assigned run identifier.
    pub id: String,
    /// Raw status string.
    pub status: String,
    /// Error reported for failed runs.
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    /// Whether the agent finished and produced its reply.
    pub fn is_completed(&self) -> bool {
        self.status == RUN_COMPLETED
    }

    /// Whether the run reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        !RUN_PENDING.contains(&self.status.as_str())
    }
}

/// Text payload of a message content part.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextContent {
    /// Plain text value.
    pub value: String,
}

/// One content part of a thread message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Text part.
    Text {
        /// Text payload.
        text: TextContent,
    },
    /// Images, files, and any part type this relay does not forward.
    #[serde(other)]
    Other,
}

/// Message stored on a thread.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadMessage {
    /// Provider-assigned message identifier.
    #[serde(default)]
    pub id: String,
    /// Author role (`user` or `assistant`).
    pub role: String,
    /// Ordered content parts.
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// Build a single-part text message.
    pub fn text(id: impl Into<String>, role: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: value.into(),
                },
            }],
        }
    }

    /// Whether the message was authored by the agent.
    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }

    /// First text part of the message, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        })
    }
}

#[derive(Deserialize)]
pub(crate) struct FileObject {
    pub(crate) id: String,
}

#[derive(Deserialize)]
pub(crate) struct MessageList {
    #[serde(default)]
    pub(crate) data: Vec<ThreadMessage>,
}
