//! Collaborator interface consumed by the relay handlers.

use crate::platform::types::{FileBatch, ProviderError, Run, Thread, ThreadMessage};
use async_trait::async_trait;
use std::path::Path;

/// Operations the relay needs from the hosted assistant platform.
///
/// The HTTP client in [`crate::platform::OpenAiClient`] implements this against the live API;
/// tests substitute fakes that return deterministic statuses.
#[async_trait]
pub trait AssistantPlatform: Send + Sync {
    /// Upload the file at `path` into the vector store as a single-item batch and wait until the
    /// batch leaves `in_progress`.
    async fn upload_and_poll_batch(
        &self,
        vector_store_id: &str,
        path: &Path,
    ) -> Result<FileBatch, ProviderError>;

    /// Create an empty conversation thread.
    async fn create_thread(&self) -> Result<Thread, ProviderError>;

    /// Append a user-authored message to a thread.
    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<ThreadMessage, ProviderError>;

    /// Start a run of `assistant_id` on the thread and wait for a terminal status.
    async fn create_and_poll_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, ProviderError>;

    /// List the thread's messages in provider order.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ProviderError>;
}
