use anyhow::{Context, Result};
use cinesift_core::resilience::RetryPolicy;
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{EtlError, EtlResult};

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
pub const DEFAULT_LLM_URL: &str = "https://qstash.upstash.io/llm/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Names accepted by `cinesift config get|set`.
pub const KEYS: &[&str] = &[
    "vector_url",
    "vector_token",
    "tmdb_api_key",
    "tmdb_base_url",
    "image_base_url",
    "llm_url",
    "llm_token",
    "llm_model",
    "workers",
    "tmdb_requests_per_second",
    "checkpoint_dir",
];

/// Configuration for cinesift.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (CINESIFT_* prefix)
/// 3. Config file (~/.config/cinesift/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// REST endpoint of the vector index.
    ///
    /// Can be set via:
    /// - ENV: CINESIFT_VECTOR_URL
    /// - Config: vector_url = "https://..."
    pub vector_url: Option<String>,

    /// Bearer token for the vector index.
    pub vector_token: Option<String>,

    /// TMDB API key (v3).
    pub tmdb_api_key: Option<String>,

    pub tmdb_base_url: String,

    /// Prefix joined with each poster path to form the poster link.
    pub image_base_url: String,

    /// Chat-completions endpoint used for enrichment.
    pub llm_url: String,

    pub llm_token: Option<String>,

    pub llm_model: String,

    /// Items processed concurrently per catalog page.
    pub workers: usize,

    /// Shared request budget for all TMDB calls.
    pub tmdb_requests_per_second: u32,

    /// Backoff for transient upstream failures.
    pub retry: RetryPolicy,

    /// Where resumable ingestion checkpoints are kept.
    ///
    /// Default: ~/.local/share/cinesift
    pub checkpoint_dir: PathBuf,

    /// Logger settings handed to twyg.
    pub logging: twyg::Opts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vector_url: None,
            vector_token: None,
            tmdb_api_key: None,
            tmdb_base_url: DEFAULT_TMDB_BASE_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            llm_url: DEFAULT_LLM_URL.to_string(),
            llm_token: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            workers: 4,
            tmdb_requests_per_second: 4,
            retry: RetryPolicy::default(),
            checkpoint_dir: default_checkpoint_dir(),
            logging: twyg::Opts::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/cinesift/config.toml
    /// Reads environment variables with CINESIFT_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("cinesift");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?;

        Ok(config)
    }

    pub fn require_vector_url(&self) -> EtlResult<&str> {
        required(self.vector_url.as_deref(), "vector_url")
    }

    pub fn require_vector_token(&self) -> EtlResult<&str> {
        required(self.vector_token.as_deref(), "vector_token")
    }

    pub fn require_tmdb_api_key(&self) -> EtlResult<&str> {
        required(self.tmdb_api_key.as_deref(), "tmdb_api_key")
    }

    pub fn require_llm_token(&self) -> EtlResult<&str> {
        required(self.llm_token.as_deref(), "llm_token")
    }

    /// Render a single setting for `config get`; `None` for unknown keys.
    pub fn value_of(&self, key: &str) -> Option<String> {
        let unset = || String::from("<not set>");
        let value = match key {
            "vector_url" => self.vector_url.clone().unwrap_or_else(unset),
            "vector_token" => redact(self.vector_token.as_deref()),
            "tmdb_api_key" => redact(self.tmdb_api_key.as_deref()),
            "tmdb_base_url" => self.tmdb_base_url.clone(),
            "image_base_url" => self.image_base_url.clone(),
            "llm_url" => self.llm_url.clone(),
            "llm_token" => redact(self.llm_token.as_deref()),
            "llm_model" => self.llm_model.clone(),
            "workers" => self.workers.to_string(),
            "tmdb_requests_per_second" => self.tmdb_requests_per_second.to_string(),
            "checkpoint_dir" => self.checkpoint_dir.display().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> EtlResult<&'a str> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| {
        EtlError::Config(format!(
            "`{key}` is not set (config file or CINESIFT_{})",
            key.to_uppercase()
        ))
    })
}

fn redact(secret: Option<&str>) -> String {
    match secret {
        Some(s) if s.chars().count() > 4 => format!("{}…", s.chars().take(4).collect::<String>()),
        Some(_) => "<set>".to_string(),
        None => "<not set>".to_string(),
    }
}

/// Get the default checkpoint directory.
///
/// Returns: ~/.local/share/cinesift (or platform equivalent)
fn default_checkpoint_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cinesift")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/cinesift/config.toml
/// - macOS: ~/Library/Application Support/cinesift/config.toml
/// - Windows: %APPDATA%\cinesift\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cinesift")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Cinesift Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (CINESIFT_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Vector index REST endpoint and token (Upstash Vector)
#
# Can also be set via:
# - Environment: CINESIFT_VECTOR_URL, CINESIFT_VECTOR_TOKEN
vector_url = "https://your-index.upstash.io"
vector_token = "your-vector-token-here"

# TMDB API key (v3)
#
# Register at: https://www.themoviedb.org/settings/api
tmdb_api_key = "your-tmdb-api-key-here"
#tmdb_base_url = "https://api.themoviedb.org/3"
#image_base_url = "https://image.tmdb.org/t/p/w500"

# Text generation service used to write summaries, keywords and abstracts
llm_token = "your-llm-token-here"
#llm_url = "https://qstash.upstash.io/llm/v1/chat/completions"
#llm_model = "mistralai/Mistral-7B-Instruct-v0.2"

# Items processed concurrently per catalog page
#workers = 4

# Request budget shared by every TMDB call
#tmdb_requests_per_second = 4

# Resumable ingestion checkpoints
#
# Default: Platform-specific data directory
#checkpoint_dir = "/path/to/cinesift"

# Backoff for transient upstream failures (set max_retries = 0 to disable)
[retry]
max_retries = 3
min_delay_ms = 500
max_delay_ms = 10000

[logging]
coloured = true
level = "info"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
