//! Application-level configuration loading: listening port, stores, local cache and the
//! completion API used for transcripts.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PLAY_NINE_BACK_CONFIG_PATH";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://play-nine.db";
const DEFAULT_CACHE_PATH: &str = "data/local-cache.json";
const DEFAULT_CONNECTIVITY_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_COMPLETION_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PARSING_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";
const DEFAULT_WELCOME_MODEL: &str = "anthropic/claude-3-opus";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Port the HTTP server listens on.
    pub port: u16,
    /// SQLite database backing the `/api` surface.
    pub database_url: String,
    /// Another instance's base URL; when set, games and facts are stored there.
    pub remote_api_url: Option<String>,
    /// Bearer token sent to the remote instance.
    pub remote_api_token: Option<String>,
    /// JSON file used as the offline cache.
    pub local_cache_path: PathBuf,
    /// Pause between two connectivity checks.
    pub connectivity_interval: Duration,
    /// Limit applied to every store call made by the reconciler.
    pub remote_timeout: Duration,
    /// Completion API settings.
    pub llm: LlmConfig,
}

#[derive(Debug, Clone)]
/// Settings of the chat-completion API used to parse transcripts.
pub struct LlmConfig {
    /// Bearer token; without one every completion call fails.
    pub api_key: Option<String>,
    /// Chat completions endpoint.
    pub endpoint: String,
    /// Per-call limit.
    pub timeout: Duration,
    /// Model used for each kind of request.
    pub models: ModelSelection,
    /// Shape of generated welcome messages.
    pub welcome: WelcomeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Model identifiers per request kind.
pub struct ModelSelection {
    /// Model reading scores out of transcripts.
    pub score_parsing: String,
    /// Model reading the roster out of a setup transcript.
    pub setup_parsing: String,
    /// Model writing the announcer welcome.
    pub welcome_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Model choices and welcome style in effect; starts from [`LlmConfig`] and
/// can be changed while the server runs.
pub struct ModelSettings {
    /// Model per request kind.
    #[serde(flatten)]
    pub models: ModelSelection,
    /// Shape of generated welcome messages.
    #[serde(default)]
    pub welcome_settings: WelcomeSettings,
}

impl LlmConfig {
    /// Settings the transcript parser starts with.
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            models: self.models.clone(),
            welcome_settings: self.welcome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
/// Requested welcome message length.
pub enum MessageLength {
    /// One or two sentences.
    Short,
    #[default]
    /// A short paragraph.
    Medium,
    /// A full introduction.
    Long,
}

impl MessageLength {
    /// Name used in prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageLength::Short => "short",
            MessageLength::Medium => "medium",
            MessageLength::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
/// Requested welcome message tone.
pub enum MessageTone {
    /// Polished announcer.
    Professional,
    /// Friendly and relaxed.
    Casual,
    #[default]
    /// Teasing the players.
    Snarky,
    /// High energy.
    Enthusiastic,
    /// Over the top.
    Dramatic,
}

impl MessageTone {
    /// Name used in prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageTone::Professional => "professional",
            MessageTone::Casual => "casual",
            MessageTone::Snarky => "snarky",
            MessageTone::Enthusiastic => "enthusiastic",
            MessageTone::Dramatic => "dramatic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
/// Length and tone of generated welcome messages.
pub struct WelcomeSettings {
    /// Requested length.
    #[serde(default)]
    pub length: MessageLength,
    /// Requested tone.
    #[serde(default)]
    pub tone: MessageTone,
}

impl AppConfig {
    /// Load the configuration from disk, then apply environment overrides.
    ///
    /// A missing or unreadable file falls back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };
        config.with_env_overrides(|key| env::var(key).ok())
    }

    /// Parse the JSON configuration format. Absent keys keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Apply `PORT`/`SERVER_PORT`, `DATABASE_URL`, `REMOTE_API_URL`,
    /// `REMOTE_API_TOKEN`, `LOCAL_CACHE_PATH` and `OPENROUTER_API_KEY` as
    /// returned by `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(port) = non_empty("PORT").or_else(|| non_empty("SERVER_PORT")) {
            match port.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(err) => warn!(value = %port, error = %err, "ignoring invalid port override"),
            }
        }
        if let Some(url) = non_empty("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(url) = non_empty("REMOTE_API_URL") {
            self.remote_api_url = Some(url);
        }
        if let Some(token) = non_empty("REMOTE_API_TOKEN") {
            self.remote_api_token = Some(token);
        }
        if let Some(path) = non_empty("LOCAL_CACHE_PATH") {
            self.local_cache_path = PathBuf::from(path);
        }
        if let Some(key) = non_empty("OPENROUTER_API_KEY") {
            self.llm.api_key = Some(key);
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    remote_api_url: Option<String>,
    #[serde(default)]
    remote_api_token: Option<String>,
    #[serde(default)]
    local_cache_path: Option<PathBuf>,
    #[serde(default)]
    connectivity_interval_secs: Option<u64>,
    #[serde(default)]
    remote_timeout_secs: Option<u64>,
    #[serde(default)]
    llm: RawLlmConfig,
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the `llm` section.
struct RawLlmConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    models: RawModels,
    #[serde(default)]
    welcome: WelcomeSettings,
}

#[derive(Debug, Default, Deserialize)]
struct RawModels {
    #[serde(default)]
    score_parsing: Option<String>,
    #[serde(default)]
    setup_parsing: Option<String>,
    #[serde(default)]
    welcome_message: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            port: value.port.unwrap_or(DEFAULT_PORT),
            database_url: value
                .database_url
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            remote_api_url: value.remote_api_url.filter(|url| !url.trim().is_empty()),
            remote_api_token: value
                .remote_api_token
                .filter(|token| !token.trim().is_empty()),
            local_cache_path: value
                .local_cache_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            connectivity_interval: seconds_or(
                value.connectivity_interval_secs,
                DEFAULT_CONNECTIVITY_INTERVAL,
            ),
            remote_timeout: seconds_or(value.remote_timeout_secs, DEFAULT_REMOTE_TIMEOUT),
            llm: value.llm.into(),
        }
    }
}

impl From<RawLlmConfig> for LlmConfig {
    fn from(value: RawLlmConfig) -> Self {
        let parsing = || DEFAULT_PARSING_MODEL.to_string();
        Self {
            api_key: value.api_key.filter(|key| !key.trim().is_empty()),
            endpoint: value
                .endpoint
                .unwrap_or_else(|| DEFAULT_COMPLETION_ENDPOINT.to_string()),
            timeout: seconds_or(value.timeout_secs, DEFAULT_COMPLETION_TIMEOUT),
            models: ModelSelection {
                score_parsing: value.models.score_parsing.unwrap_or_else(parsing),
                setup_parsing: value.models.setup_parsing.unwrap_or_else(parsing),
                welcome_message: value
                    .models
                    .welcome_message
                    .unwrap_or_else(|| DEFAULT_WELCOME_MODEL.to_string()),
            },
            welcome: value.welcome,
        }
    }
}

/// Zero durations are treated as unset.
fn seconds_or(value: Option<u64>, default: Duration) -> Duration {
    value
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
