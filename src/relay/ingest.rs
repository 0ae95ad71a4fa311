//! Document ingestion: stage the upload, index it into the vector store, report the batch.

use crate::config::Config;
use crate::platform::AssistantPlatform;
use crate::relay::error::RelayError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Case-insensitive filename suffixes accepted for ingestion.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".pdf", ".txt", ".md", ".docx"];

/// File received from the caller.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied filename.
    pub filename: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Result of a completed ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Files the provider reports as indexed.
    pub files_completed: u64,
    /// Provider batch identifier.
    pub batch_id: String,
}

/// Whether the filename ends with one of [`ALLOWED_EXTENSIONS`].
pub fn is_supported(filename: &str) -> bool {
    let lowered = filename.to_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .any(|extension| lowered.ends_with(extension))
}

/// Upload bytes written to a private temporary directory.
///
/// Dropping the value removes the directory and the file inside it, so the copy never outlives
/// the request regardless of how the handler exits.
pub struct StagedUpload {
    _dir: TempDir,
    path: PathBuf,
}

impl StagedUpload {
    /// Write `upload` under a fresh directory inside `root`, keeping only the final path
    /// component of the client filename.
    pub async fn write(root: &Path, upload: &Upload) -> Result<Self, RelayError> {
        let name = Path::new(&upload.filename)
            .file_name()
            .ok_or_else(|| RelayError::UnsupportedFormat(upload.filename.clone()))?;
        tokio::fs::create_dir_all(root).await?;
        let dir = tempfile::Builder::new()
            .prefix("upload-")
            .tempdir_in(root)?;
        let path = dir.path().join(name);
        tokio::fs::write(&path, &upload.bytes).await?;
        tracing::debug!(path = %path.display(), size = upload.bytes.len(), "Staged upload");
        Ok(Self { _dir: dir, path })
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Validate, stage, and index one document into the configured vector store.
pub async fn ingest_document<P>(
    platform: &P,
    config: &Config,
    upload: Upload,
) -> Result<IngestOutcome, RelayError>
where
    P: AssistantPlatform + ?Sized,
{
    if !is_supported(&upload.filename) {
        tracing::info!(filename = %upload.filename, "Rejected unsupported upload");
        return Err(RelayError::UnsupportedFormat(upload.filename));
    }

    let staged = StagedUpload::write(&config.upload_root(), &upload).await?;
    let batch = platform
        .upload_and_poll_batch(&config.vector_store_id, staged.path())
        .await?;

    if !batch.is_completed() {
        tracing::warn!(batch_id = %batch.id, status = %batch.status, "File batch did not complete");
        return Err(RelayError::ProcessingFailed(batch.status));
    }

    tracing::info!(
        filename = %upload.filename,
        batch_id = %batch.id,
        completed = batch.file_counts.completed,
        "Document indexed"
    );
    Ok(IngestOutcome {
        files_completed: batch.file_counts.completed,
        batch_id: batch.id,
    })
}
