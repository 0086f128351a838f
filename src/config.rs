use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "labsight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.together.xyz/v1";
pub const DEFAULT_LLM_MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Retrieval chunking: characters per chunk and overlap between neighbours.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_RETRIEVAL_TOP_K: usize = 4;

pub const ENV_API_KEY: &str = "LABSIGHT_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "TOGETHER_API_KEY";
pub const ENV_LLM_BASE_URL: &str = "LABSIGHT_LLM_BASE_URL";
pub const ENV_LLM_MODEL: &str = "LABSIGHT_LLM_MODEL";
pub const ENV_LLM_TIMEOUT_SECS: &str = "LABSIGHT_LLM_TIMEOUT_SECS";
pub const ENV_REFERENCE_RANGES: &str = "LABSIGHT_REFERENCE_RANGES";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing credential: set {0}")]
    MissingCredential(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "labsight=debug,warn"
    } else {
        "labsight=info,warn"
    }
}

/// Application data directory (`<data dir>/labsight`), falling back to the
/// current directory when the platform reports none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of a reference-range override file.
pub fn default_reference_ranges_path() -> PathBuf {
    app_data_dir().join("reference_ranges.json")
}

/// Runtime configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub reference_ranges: Option<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            reference_ranges: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            retrieval_top_k: DEFAULT_RETRIEVAL_TOP_K,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Unparseable numbers keep their default
    /// and are logged.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let llm_timeout_secs = match get(ENV_LLM_TIMEOUT_SECS) {
            Some(raw) => parse_number(ENV_LLM_TIMEOUT_SECS, &raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Using default LLM timeout");
                defaults.llm_timeout_secs
            }),
            None => defaults.llm_timeout_secs,
        };

        let reference_ranges = get(ENV_REFERENCE_RANGES).map(PathBuf::from).or_else(|| {
            let path = default_reference_ranges_path();
            path.is_file().then_some(path)
        });

        Self {
            api_key: get(ENV_API_KEY).or_else(|| get(ENV_API_KEY_FALLBACK)),
            llm_base_url: get(ENV_LLM_BASE_URL).unwrap_or(defaults.llm_base_url),
            llm_model: get(ENV_LLM_MODEL).unwrap_or(defaults.llm_model),
            llm_timeout_secs,
            reference_ranges,
            ..defaults
        }
    }

    /// The API key, or `MissingCredential` naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingCredential(ENV_API_KEY.to_string()))
    }
}

fn parse_number(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: raw.to_string(),
    })
}
