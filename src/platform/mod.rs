//! Hosted assistant platform integration.

pub mod assistant;
pub mod client;
pub mod types;

pub use assistant::AssistantPlatform;
pub use client::OpenAiClient;
pub use types::{
    FileBatch, FileCounts, MessageContent, ProviderError, Run, RunError, TextContent, Thread,
    ThreadMessage,
};
