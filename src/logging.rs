//! Tracing configuration and log routing.
//!
//! Logs always go to stdout through a compact formatter. A second, non-blocking file layer is
//! controlled by `KNOWLEDGE_RELAY_LOG_FILE`:
//!
//! - unset or blank: append to `logs/knowledge-relay.log`;
//! - `off`: stdout only;
//! - any other value: append to that path.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "KNOWLEDGE_RELAY_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "knowledge-relay.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where the file layer writes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Disabled,
    File(PathBuf),
}

fn resolve_target(value: Option<&str>) -> LogTarget {
    match value.map(str::trim) {
        Some(value) if value.eq_ignore_ascii_case("off") => LogTarget::Disabled,
        Some(value) if !value.is_empty() => LogTarget::File(PathBuf::from(value)),
        _ => LogTarget::File(Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE)),
    }
}

/// Install the global subscriber.
///
/// Respects `RUST_LOG` for filtering and defaults to `info`. The file writer's guard lives for
/// the rest of the process.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let file_layer = file_writer(resolve_target(std::env::var(LOG_FILE_VAR).ok().as_deref()))
        .map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact()
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

/// Open `target` for appending behind a non-blocking writer.
///
/// Failures are reported on stderr because the subscriber is not installed yet.
fn file_writer(target: LogTarget) -> Option<NonBlocking> {
    let LogTarget::File(path) = target else {
        return None;
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty())
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {err}", parent.display());
        return None;
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_blank_uses_default_file() {
        let default = LogTarget::File(PathBuf::from("logs/knowledge-relay.log"));
        assert_eq!(resolve_target(None), default);
        assert_eq!(resolve_target(Some("  ")), default);
    }

    #[test]
    fn off_disables_file_logging() {
        assert_eq!(resolve_target(Some("OFF")), LogTarget::Disabled);
        assert!(file_writer(LogTarget::Disabled).is_none());
    }

    #[test]
    fn explicit_path_is_used_verbatim() {
        assert_eq!(
            resolve_target(Some("/var/log/relay.log")),
            LogTarget::File(PathBuf::from("/var/log/relay.log"))
        );
    }
}
