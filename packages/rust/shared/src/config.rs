//! Application configuration for the brochure generator.
//!
//! User config lives at `~/.brochure/brochure.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BrochureError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "brochure.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".brochure";

/// Some sites refuse requests that do not look like a browser.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching brochure.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text-generation provider settings.
    #[serde(default)]
    pub openai: OpenAiSection,

    /// Page retrieval settings.
    #[serde(default)]
    pub fetch: FetchSection,

    /// Brochure synthesis settings.
    #[serde(default)]
    pub brochure: BrochureSection,
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSection {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat model used for both link selection and synthesis.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound for a single completion, streaming included.
    #[serde(default = "default_completion_timeout")]
    pub completion_timeout_secs: u64,
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            completion_timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_completion_timeout() -> u64 {
    120
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    /// User-Agent sent with every page request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Maximum concurrent fetches of selected links.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}
fn default_concurrency() -> usize {
    4
}

/// `[brochure]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrochureSection {
    /// Character budget of the synthesis prompt's user message.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for BrochureSection {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

fn default_max_prompt_chars() -> usize {
    10_000
}

// ---------------------------------------------------------------------------
// Runtime settings (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime page-retrieval settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Concurrent fetches of selected links; at least 1.
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.fetch.user_agent.clone(),
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            max_redirects: config.fetch.max_redirects,
            concurrency: config.fetch.concurrency.max(1),
        }
    }
}

/// Runtime text-generation settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl From<&AppConfig> for ModelConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.openai.model.clone(),
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.openai.completion_timeout_secs),
        }
    }
}

/// Runtime synthesis settings.
#[derive(Debug, Clone)]
pub struct BrochureConfig {
    pub max_prompt_chars: usize,
}

impl Default for BrochureConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for BrochureConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_prompt_chars: config.brochure.max_prompt_chars,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.brochure/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| BrochureError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.brochure/brochure.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BrochureError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BrochureError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BrochureError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BrochureError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BrochureError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A validated API credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a credential without shape checks.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Read and validate the API key named by `[openai] api_key_env`.
pub fn resolve_api_key(config: &AppConfig) -> Result<ApiKey> {
    let var_name = &config.openai.api_key_env;
    let value = std::env::var(var_name).ok();
    check_api_key(var_name, value.as_deref())
}

/// Shape checks on a raw credential value.
fn check_api_key(var_name: &str, value: Option<&str>) -> Result<ApiKey> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => {
            return Err(BrochureError::config(format!(
                "API key not found. Set the {var_name} environment variable (a .env file works too)."
            )));
        }
    };

    if value.trim() != value {
        return Err(BrochureError::config(format!(
            "the {var_name} value has leading or trailing whitespace; remove it"
        )));
    }

    if !value.starts_with("sk-") {
        tracing::warn!(
            var = %var_name,
            "API key does not start with `sk-`; fine for non-OpenAI providers, otherwise check the key"
        );
    }

    Ok(ApiKey(value.to_string()))
}
