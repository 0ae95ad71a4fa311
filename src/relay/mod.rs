//! Request workflows behind the HTTP surface: document ingestion and conversational relay.

pub mod chat;
pub mod error;
pub mod ingest;

pub use chat::{first_assistant_reply, parse_question, relay_question};
pub use error::RelayError;
pub use ingest::{ALLOWED_EXTENSIONS, IngestOutcome, StagedUpload, Upload, ingest_document};
