mod api;
mod defaults;
mod validation;

use crate::cli::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub use api::{normalize_base_url, ApiConfig};
pub use defaults::{default_data_dir, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use validation::{expand_env_var_in_string, parse_bool_flag};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding `state.json`. `${VAR}` references are expanded.
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    pub verbose: bool,
    /// Used when no key has been stored with `--set-api-key`.
    pub fallback_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JsonConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

const EXAMPLE_CONFIG: &str = r#"# popchat configuration
api:
  # Base URL of an OpenAI compatible API
  endpoint: https://api.openai.com/v1
  # Seconds before a request is abandoned
  request_timeout: 60

storage:
  # Directory of state.json (chats and settings)
  dir: ${HOME}/.cache/popchat

session:
  verbose: false
"#;

impl Config {
    /// Precedence: CLI args > env vars > config file > defaults.
    pub fn from_env_and_args(args: &Args) -> Result<Self> {
        let json_config = JsonConfig::load()?;
        Ok(Self::resolve(args, &json_config))
    }

    pub fn resolve(args: &Args, json_config: &JsonConfig) -> Self {
        let api_base_url = args
            .api_endpoint
            .clone()
            .or_else(|| env::var("POPCHAT_API_ENDPOINT").ok())
            .or(json_config.api.endpoint.clone())
            .map(|endpoint| normalize_base_url(&endpoint))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let request_timeout = env::var("POPCHAT_REQUEST_TIMEOUT")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .or(json_config.api.request_timeout)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let data_dir = env::var("POPCHAT_DATA_DIR")
            .ok()
            .or(json_config.storage.dir.clone())
            .map(|dir| PathBuf::from(expand_env_var_in_string(dir.trim())))
            .or_else(default_data_dir)
            .unwrap_or_else(|| PathBuf::from(".popchat"));

        let verbose = args.verbose
            || env::var("POPCHAT_VERBOSE")
                .ok()
                .and_then(|v| parse_bool_flag(&v))
                .or(json_config.session.verbose)
                .unwrap_or(false);

        let fallback_api_key = env::var("OPENAI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Config {
            api_base_url,
            request_timeout: Duration::from_secs(request_timeout),
            data_dir,
            verbose,
            fallback_api_key,
        }
    }

    /// Writes the example config to `~/.config/popchat/popchat.yaml`
    /// unless a file already exists there.
    pub fn init_example() -> Result<PathBuf> {
        let dir = dirs::home_dir()
            .context("Cannot determine home directory")?
            .join(".config")
            .join("popchat");
        let path = dir.join("popchat.yaml");
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        fs::write(&path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }
}

impl JsonConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(JsonConfig::default())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|s| s.to_str());
        if matches!(extension, Some("yaml") | Some("yml")) {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))
        } else {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config file: {}", path.display()))
        }
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".popchat.yaml"),
            PathBuf::from(".popchat.yml"),
            PathBuf::from(".popchat.json"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("popchat");
            paths.push(config_dir.join("popchat.yaml"));
            paths.push(config_dir.join("popchat.yml"));
            paths.push(config_dir.join("popchat.json"));
        }

        paths
    }
}

