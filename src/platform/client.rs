//! HTTP client wrapper for the hosted assistant platform.

use crate::config::Config;
use crate::platform::assistant::AssistantPlatform;
use crate::platform::types::{
    FileBatch, FileObject, MessageList, ProviderError, Run, Thread, ThreadMessage,
};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};

const POLL_AFTER_HEADER: &str = "openai-poll-after-ms";

/// Lightweight HTTP client for the vector store and assistants endpoints.
pub struct OpenAiClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) organization: Option<String>,
    pub(crate) project: Option<String>,
    pub(crate) batch_poll_interval: Duration,
    pub(crate) run_poll_interval: Duration,
    pub(crate) poll_timeout: Option<Duration>,
}

impl OpenAiClient {
    /// Construct a new client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let client = Client::builder().user_agent("knowledge-relay/0.1").build()?;

        let base_url =
            normalize_base_url(&config.openai_base_url).map_err(ProviderError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_organization = config.openai_organization.is_some(),
            has_project = config.openai_project.is_some(),
            "Initialized assistant platform HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.openai_api_key.clone(),
            organization: config.openai_organization.clone(),
            project: config.openai_project.clone(),
            batch_poll_interval: config.batch_poll_interval(),
            run_poll_interval: config.run_poll_interval(),
            poll_timeout: config.poll_timeout(),
        })
    }

    /// Upload a local file for use by assistants and vector stores, returning its file id.
    pub async fn upload_file(&self, path: &Path) -> Result<String, ProviderError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ProviderError::InvalidPath(path.display().to_string()))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();

        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", Part::bytes(bytes).file_name(file_name.clone()));
        let response = self
            .request(Method::POST, "files")
            .multipart(form)
            .send()
            .await?;
        let response = self.ensure_success(response, "file upload").await?;
        let FileObject { id } = response.json().await?;
        tracing::debug!(file_id = %id, file_name = %file_name, size, "File uploaded");
        Ok(id)
    }

    /// Create a batch attaching already uploaded files to a vector store.
    pub async fn create_file_batch(
        &self,
        vector_store_id: &str,
        file_ids: &[String],
    ) -> Result<FileBatch, ProviderError> {
        let response = self
            .request(
                Method::POST,
                &format!("vector_stores/{vector_store_id}/file_batches"),
            )
            .json(&json!({ "file_ids": file_ids }))
            .send()
            .await?;
        let response = self.ensure_success(response, "file batch creation").await?;
        let batch: FileBatch = response.json().await?;
        tracing::debug!(
            vector_store = vector_store_id,
            batch_id = %batch.id,
            status = %batch.status,
            "File batch created"
        );
        Ok(batch)
    }

    /// Start a run without waiting for it to settle.
    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ProviderError> {
        let response = self
            .request(Method::POST, &format!("threads/{thread_id}/runs"))
            .json(&json!({ "assistant_id": assistant_id }))
            .send()
            .await?;
        let response = self.ensure_success(response, "run creation").await?;
        let run: Run = response.json().await?;
        tracing::debug!(thread_id, run_id = %run.id, status = %run.status, "Run created");
        Ok(run)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("openai-beta", "assistants=v2");
        if let Some(organization) = &self.organization {
            req = req.header("openai-organization", organization);
        }
        if let Some(project) = &self.project {
            req = req.header("openai-project", project);
        }
        req
    }

    async fn ensure_success(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = ProviderError::UnexpectedStatus { status, body };
            tracing::error!(operation, error = %error, "Provider request failed");
            Err(error)
        }
    }

    /// Re-fetch `path` until `settled` accepts the resource, honoring the provider's poll hint.
    async fn poll<T, F>(
        &self,
        resource: &'static str,
        id: &str,
        path: &str,
        interval: Duration,
        settled: F,
    ) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let started = Instant::now();
        loop {
            let response = self.request(Method::GET, path).send().await?;
            let response = self.ensure_success(response, resource).await?;
            let delay = poll_after(response.headers()).unwrap_or(interval);
            let current: T = response.json().await?;
            if settled(&current) {
                return Ok(current);
            }

            let waited = started.elapsed();
            if let Some(limit) = self.poll_timeout
                && waited + delay > limit
            {
                let error = ProviderError::PollTimeout {
                    resource,
                    id: id.to_string(),
                    waited,
                };
                tracing::warn!(error = %error, "Polling deadline exceeded");
                return Err(error);
            }

            tracing::debug!(
                resource,
                id,
                delay_ms = delay.as_millis() as u64,
                "Still pending; polling again"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AssistantPlatform for OpenAiClient {
    async fn upload_and_poll_batch(
        &self,
        vector_store_id: &str,
        path: &Path,
    ) -> Result<FileBatch, ProviderError> {
        let file_id = self.upload_file(path).await?;
        let batch = self
            .create_file_batch(vector_store_id, std::slice::from_ref(&file_id))
            .await?;
        if batch.is_settled() {
            return Ok(batch);
        }

        let batch_path = format!("vector_stores/{vector_store_id}/file_batches/{}", batch.id);
        let batch: FileBatch = self
            .poll(
                "file batch",
                &batch.id,
                &batch_path,
                self.batch_poll_interval,
                FileBatch::is_settled,
            )
            .await?;
        tracing::info!(
            vector_store = vector_store_id,
            batch_id = %batch.id,
            status = %batch.status,
            completed = batch.file_counts.completed,
            failed = batch.file_counts.failed,
            "File batch settled"
        );
        Ok(batch)
    }

    async fn create_thread(&self) -> Result<Thread, ProviderError> {
        let response = self
            .request(Method::POST, "threads")
            .json(&json!({}))
            .send()
            .await?;
        let response = self.ensure_success(response, "thread creation").await?;
        let thread: Thread = response.json().await?;
        tracing::debug!(thread_id = %thread.id, "Thread created");
        Ok(thread)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<ThreadMessage, ProviderError> {
        let response = self
            .request(Method::POST, &format!("threads/{thread_id}/messages"))
            .json(&json!({ "role": "user", "content": content }))
            .send()
            .await?;
        let response = self.ensure_success(response, "message creation").await?;
        Ok(response.json().await?)
    }

    async fn create_and_poll_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, ProviderError> {
        let run = self.create_run(thread_id, assistant_id).await?;
        if run.is_terminal() {
            return Ok(run);
        }

        let run_path = format!("threads/{thread_id}/runs/{}", run.id);
        let run: Run = self
            .poll("run", &run.id, &run_path, self.run_poll_interval, Run::is_terminal)
            .await?;
        tracing::info!(thread_id, run_id = %run.id, status = %run.status, "Run settled");
        Ok(run)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ProviderError> {
        let response = self
            .request(Method::GET, &format!("threads/{thread_id}/messages"))
            .send()
            .await?;
        let response = self.ensure_success(response, "message listing").await?;
        let MessageList { data } = response.json().await?;
        Ok(data)
    }
}

fn poll_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(POLL_AFTER_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_millis)
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };
    use reqwest::header::HeaderValue;

    fn test_client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new(&test_config(base_url)).expect("client")
    }

    #[test]
    fn poll_after_reads_numeric_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(poll_after(&headers), None);
        headers.insert(POLL_AFTER_HEADER, HeaderValue::from_static("250"));
        assert_eq!(poll_after(&headers), Some(Duration::from_millis(250)));
        headers.insert(POLL_AFTER_HEADER, HeaderValue::from_static("soon"));
        assert_eq!(poll_after(&headers), None);
    }

    #[test]
    fn endpoints_join_without_duplicate_slashes() {
        let base = normalize_base_url("https://api.example.com/v1/").expect("url");
        assert_eq!(
            format_endpoint(&base, "/threads"),
            "https://api.example.com/v1/threads"
        );
        assert!(normalize_base_url("not a url").is_err());
    }

    #[tokio::test]
    async fn upload_and_poll_batch_uploads_then_polls_until_settled() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").expect("write");

        let upload = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/files")
                    .header("authorization", "Bearer sk-test")
                    .header("openai-beta", "assistants=v2")
                    .body_contains("assistants")
                    .body_contains("report.pdf");
                then.status(200)
                    .json_body(json!({ "id": "file_1", "object": "file", "purpose": "assistants" }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/vector_stores/vs_test/file_batches")
                    .json_body(json!({ "file_ids": ["file_1"] }));
                then.status(200).json_body(json!({
                    "id": "batch_123",
                    "object": "vector_store.file_batch",
                    "status": "in_progress",
                    "file_counts": { "in_progress": 1, "completed": 0, "failed": 0, "cancelled": 0, "total": 1 }
                }));
            })
            .await;
        let mut pending = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/vector_stores/vs_test/file_batches/batch_123");
                then.status(200)
                    .header(POLL_AFTER_HEADER, "1")
                    .json_body(json!({
                        "id": "batch_123",
                        "status": "in_progress",
                        "file_counts": { "in_progress": 1, "completed": 0, "failed": 0, "cancelled": 0, "total": 1 }
                    }));
            })
            .await;
        let settled = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/vector_stores/vs_test/file_batches/batch_123");
                then.status(200).json_body(json!({
                    "id": "batch_123",
                    "status": "completed",
                    "file_counts": { "in_progress": 0, "completed": 1, "failed": 0, "cancelled": 0, "total": 1 }
                }));
            })
            .await;

        // A one-minute interval only finishes in time if the provider's hint replaces it.
        let mut client = test_client(&server.base_url());
        client.batch_poll_interval = Duration::from_secs(60);
        let settle_after_first_poll = async {
            while pending.hits_async().await == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            pending.delete_async().await;
        };
        let (batch, ()) = tokio::join!(
            tokio::time::timeout(
                Duration::from_secs(10),
                client.upload_and_poll_batch("vs_test", &path)
            ),
            settle_after_first_poll,
        );
        let batch = batch.expect("poll hint shortens the wait").expect("batch");

        upload.assert_async().await;
        create.assert_async().await;
        settled.assert_async().await;
        assert_eq!(batch.id, "batch_123");
        assert!(batch.is_completed());
        assert_eq!(batch.file_counts.completed, 1);
    }

    #[tokio::test]
    async fn run_polling_stops_at_terminal_status() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/threads/thread_1/runs")
                    .json_body(json!({ "assistant_id": "asst_test" }));
                then.status(200)
                    .json_body(json!({ "id": "run_1", "object": "thread.run", "status": "queued" }));
            })
            .await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET).path("/threads/thread_1/runs/run_1");
                then.status(200).json_body(json!({
                    "id": "run_1",
                    "status": "failed",
                    "last_error": { "code": "server_error", "message": "boom" }
                }));
            })
            .await;

        let client = test_client(&server.base_url());
        let run = client
            .create_and_poll_run("thread_1", "asst_test")
            .await
            .expect("run");

        create.assert_async().await;
        poll.assert_async().await;
        assert_eq!(run.status, "failed");
        assert_eq!(
            run.last_error.as_ref().map(|error| error.message.as_str()),
            Some("boom")
        );
    }

    #[tokio::test]
    async fn polling_respects_deadline() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/threads/thread_1/runs");
                then.status(200)
                    .json_body(json!({ "id": "run_1", "status": "queued" }));
            })
            .await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET).path("/threads/thread_1/runs/run_1");
                then.status(200)
                    .json_body(json!({ "id": "run_1", "status": "in_progress" }));
            })
            .await;

        let mut client = test_client(&server.base_url());
        client.poll_timeout = Some(Duration::ZERO);
        let err = client
            .create_and_poll_run("thread_1", "asst_test")
            .await
            .expect_err("deadline");

        assert!(matches!(err, ProviderError::PollTimeout { resource: "run", ref id, .. } if id == "run_1"));
        assert_eq!(poll.hits_async().await, 1);
    }

    #[tokio::test]
    async fn unexpected_status_carries_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/threads");
                then.status(401)
                    .body(r#"{"error":{"message":"Incorrect API key provided"}}"#);
            })
            .await;

        let client = test_client(&server.base_url());
        let err = client.create_thread().await.expect_err("unauthorized");
        match err {
            ProviderError::UnexpectedStatus { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert!(body.contains("Incorrect API key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_messages_preserves_provider_order() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/threads/thread_1/messages");
                then.status(200).json_body(json!({
                    "object": "list",
                    "data": [
                        { "id": "msg_2", "role": "assistant", "content": [{ "type": "text", "text": { "value": "Hello", "annotations": [] } }] },
                        { "id": "msg_1", "role": "user", "content": [{ "type": "text", "text": { "value": "hi", "annotations": [] } }] }
                    ],
                    "has_more": false
                }));
            })
            .await;

        let client = test_client(&server.base_url());
        let messages = client.list_messages("thread_1").await.expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "msg_2");
        assert_eq!(messages[0].first_text(), Some("Hello"));
        assert_eq!(messages[1].role, "user");
    }
}
