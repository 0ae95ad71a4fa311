#![deny(missing_docs)]

//! Core library for the Knowledge Relay server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Relay activity counters.
pub mod metrics;
/// Hosted assistant platform integration.
pub mod platform;
/// Document ingestion and conversational relay workflows.
pub mod relay;
