//! Server configuration.
//!
//! Loaded from environment variables (with `.env` support via `dotenvy` in
//! `main`). There is no process-wide mutable configuration state; the loaded
//! [`ServerConfig`] is injected into [`crate::state::AppState`] and from
//! there into each session's link.

use thiserror::Error;

/// Default bind host.
const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
const DEFAULT_PORT: u16 = 8080;

/// Default realtime model.
const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";

/// Default voice for spoken output.
const DEFAULT_VOICE: &str = "verse";

/// Default memory-extraction model.
const DEFAULT_SUMMARIZER_MODEL: &str = "gpt-4.1-mini";

/// Default number of ranked memories rendered into session instructions.
const DEFAULT_MEMORY_LIMIT: usize = 20;

/// Configuration load/validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// OPENAI_API_KEY is unset or empty
    #[error("OPENAI_API_KEY must be set")]
    MissingApiKey,

    /// A numeric variable did not parse
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// OpenAI API key, used for both the realtime link and the summarizer
    pub openai_api_key: String,
    /// Realtime model identifier
    pub realtime_model: String,
    /// Voice for spoken output
    pub realtime_voice: String,
    /// Realtime endpoint override (tests, proxies); `None` uses the public API
    pub realtime_endpoint: Option<String>,
    /// Chat model used for post-session memory extraction
    pub summarizer_model: String,
    /// Summarizer endpoint override; `None` uses the public API
    pub summarizer_endpoint: Option<String>,
    /// Ranked-memory fetch limit for session instructions
    pub memory_limit: usize,
    /// CORS allowed origins (comma-separated, or "*"); `None` disables CORS
    pub cors_allowed_origins: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | variable | default |
    /// |---|---|
    /// | `VOICELINE_HOST` | `127.0.0.1` |
    /// | `VOICELINE_PORT` | `8080` |
    /// | `OPENAI_API_KEY` | required |
    /// | `OPENAI_REALTIME_MODEL` | `gpt-4o-realtime-preview` |
    /// | `VOICELINE_VOICE` | `verse` |
    /// | `VOICELINE_REALTIME_ENDPOINT` | unset |
    /// | `VOICELINE_SUMMARIZER_MODEL` | `gpt-4.1-mini` |
    /// | `VOICELINE_SUMMARIZER_ENDPOINT` | unset |
    /// | `VOICELINE_MEMORY_LIMIT` | `20` |
    /// | `CORS_ALLOWED_ORIGINS` | unset |
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = non_empty_var("OPENAI_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let port = match non_empty_var("VOICELINE_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "VOICELINE_PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let memory_limit = match non_empty_var("VOICELINE_MEMORY_LIMIT") {
            Some(raw) => raw.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                name: "VOICELINE_MEMORY_LIMIT",
                value: raw,
            })?,
            None => DEFAULT_MEMORY_LIMIT,
        };

        Ok(Self {
            host: non_empty_var("VOICELINE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            openai_api_key,
            realtime_model: non_empty_var("OPENAI_REALTIME_MODEL")
                .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
            realtime_voice: non_empty_var("VOICELINE_VOICE")
                .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            realtime_endpoint: non_empty_var("VOICELINE_REALTIME_ENDPOINT"),
            summarizer_model: non_empty_var("VOICELINE_SUMMARIZER_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARIZER_MODEL.to_string()),
            summarizer_endpoint: non_empty_var("VOICELINE_SUMMARIZER_ENDPOINT"),
            memory_limit,
            cors_allowed_origins: non_empty_var("CORS_ALLOWED_ORIGINS"),
        })
    }

    /// Bind address as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
