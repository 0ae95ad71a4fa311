use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default base URL of the hosted assistant platform.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default wait between vector store batch polls.
pub const DEFAULT_BATCH_POLL_INTERVAL_MS: u64 = 3000;
/// Default wait between agent run polls.
pub const DEFAULT_RUN_POLL_INTERVAL_MS: u64 = 1000;
/// Default multipart body limit for document uploads (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the relay, built once at startup and shared by reference.
#[derive(Clone)]
pub struct Config {
    /// Credential sent as a bearer token to the assistant platform.
    pub openai_api_key: String,
    /// Base URL of the assistant platform API.
    pub openai_base_url: String,
    /// Optional organization header value.
    pub openai_organization: Option<String>,
    /// Optional project header value.
    pub openai_project: Option<String>,
    /// Vector store receiving uploaded documents.
    pub vector_store_id: String,
    /// Assistant that answers relayed questions.
    pub knowledge_agent_id: String,
    /// Wait between polls of a file batch.
    pub batch_poll_interval_ms: u64,
    /// Wait between polls of an agent run.
    pub run_poll_interval_ms: u64,
    /// Optional deadline for a single polling wait; unbounded when absent.
    pub poll_timeout_secs: Option<u64>,
    /// Root directory for per-request upload directories; system temp dir when absent.
    pub upload_dir: Option<PathBuf>,
    /// Maximum accepted multipart body size.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Blank values count as absent, so optional settings fall back to their defaults and
    /// required ones fail with [`ConfigError::MissingVariable`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        Ok(Self {
            openai_api_key: vars.required("OPENAI_API_KEY")?,
            openai_base_url: vars
                .optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_organization: vars.optional("OPENAI_ORGANIZATION"),
            openai_project: vars.optional("OPENAI_PROJECT"),
            vector_store_id: vars.required("OPENAI_VECTOR_STORE_ID")?,
            knowledge_agent_id: vars.required("KNOWLEDGE_AGENT_ID")?,
            batch_poll_interval_ms: vars
                .parsed("BATCH_POLL_INTERVAL_MS")?
                .unwrap_or(DEFAULT_BATCH_POLL_INTERVAL_MS),
            run_poll_interval_ms: vars
                .parsed("RUN_POLL_INTERVAL_MS")?
                .unwrap_or(DEFAULT_RUN_POLL_INTERVAL_MS),
            poll_timeout_secs: vars.parsed("PROVIDER_POLL_TIMEOUT_SECS")?,
            upload_dir: vars.optional("UPLOAD_DIR").map(PathBuf::from),
            max_upload_bytes: vars
                .parsed("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            server_port: vars.parsed("SERVER_PORT")?,
        })
    }

    /// Interval between batch polls.
    pub fn batch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.batch_poll_interval_ms)
    }

    /// Interval between run polls.
    pub fn run_poll_interval(&self) -> Duration {
        Duration::from_millis(self.run_poll_interval_ms)
    }

    /// Deadline applied to each polling wait, if any.
    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_secs.map(Duration::from_secs)
    }

    /// Directory under which per-request upload directories are created.
    pub fn upload_root(&self) -> PathBuf {
        self.upload_dir.clone().unwrap_or_else(env::temp_dir)
    }
}

// Hand-written so the API key never reaches the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_organization", &self.openai_organization)
            .field("openai_project", &self.openai_project)
            .field("vector_store_id", &self.vector_store_id)
            .field("knowledge_agent_id", &self.knowledge_agent_id)
            .field("batch_poll_interval_ms", &self.batch_poll_interval_ms)
            .field("run_poll_interval_ms", &self.run_poll_interval_ms)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("server_port", &self.server_port)
            .finish()
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        parse_value(key, self.optional(key))
    }
}

fn parse_value<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string()))
    })
    .transpose()
}

/// Read an optional `.env` file and load the configuration from the environment.
///
/// When `env_file` is given it must exist; otherwise a `.env` in the working directory is used
/// if present.
pub fn load(env_file: Option<&Path>) -> anyhow::Result<Config> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(Config::from_env()?)
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str) -> Config {
    Config {
        openai_api_key: "sk-test".into(),
        openai_base_url: base_url.into(),
        openai_organization: None,
        openai_project: None,
        vector_store_id: "vs_test".into(),
        knowledge_agent_id: "asst_test".into(),
        batch_poll_interval_ms: 1,
        run_poll_interval_ms: 1,
        poll_timeout_secs: None,
        upload_dir: None,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        server_port: None,
    }
}
