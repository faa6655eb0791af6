//! Client config load/save for `~/.csec/config.yaml`.
//! Two sections: api.* (backend endpoints) and auth.* (token storage).

use std::path::{Path, PathBuf};

use thiserror::Error;

/// REST base URL used when `api.base_url` is unset.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Path of the streaming chat endpoint on the backend.
pub const CHAT_ENDPOINT: &str = "/ws/chat/";

/// API section (base_url, ws_base_url).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ApiSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Explicit WebSocket base. When unset it is derived from
    /// `base_url` by rewriting the scheme (http -> ws, https -> wss).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_base_url: Option<String>,
}

/// Auth section (tokens_path).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AuthSection {
    /// Where the credential pair is persisted. Defaults to
    /// `tokens.json` next to the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_path: Option<String>,
}

/// Full client config.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub auth: AuthSection,
}

impl Config {
    /// REST base URL with the default applied.
    pub fn api_base_url(&self) -> String {
        self.api
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// Build the WebSocket URL for `path` (e.g. `/ws/chat/`).
    pub fn websocket_url(&self, path: &str) -> String {
        if let Some(ws_base) = &self.api.ws_base_url {
            return format!("{}{}", ws_base, path);
        }
        let base = self.api_base_url();
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base
        };
        format!("{}{}", base, path)
    }

    /// Full URL of the streaming chat endpoint.
    pub fn chat_url(&self) -> String {
        self.websocket_url(CHAT_ENDPOINT)
    }

    /// Where the credential pair lives: `auth.tokens_path` if set,
    /// otherwise `tokens.json` in the directory holding `config_path`.
    pub fn tokens_path(&self, config_path: &Path) -> PathBuf {
        if let Some(path) = &self.auth.tokens_path {
            return PathBuf::from(path);
        }
        match config_path.parent() {
            Some(dir) => dir.join("tokens.json"),
            None => PathBuf::from("tokens.json"),
        }
    }
}

/// Returns the default config file path: `~/.csec/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".csec").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file. Path is typically `~/.csec/config.yaml`.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load config from a YAML file, or the defaults when the file does
/// not exist.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    load(path)
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Config load/save error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
