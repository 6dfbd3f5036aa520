//! Configuration loading and auth-mode resolution.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CommandCenterError, Result};

/// Environment variable consulted for the API token when `auth.token_env` is unset.
pub const DEFAULT_TOKEN_ENV: &str = "API_TOKEN";

/// Top-level Command Center configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Directory of the viewer SPA. Served at `/` when it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Auth mode for write endpoints: "none" or "token".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl AuthConfig {
    /// Resolve the bearer token from the direct value or the env var.
    pub fn resolve_token(&self) -> Option<String> {
        let env = self
            .token_env
            .clone()
            .or_else(|| Some(DEFAULT_TOKEN_ENV.to_string()));
        resolve_secret_field(&self.token, &env)
    }
}

/// How write endpoints are protected.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// No token required. Only ever chosen explicitly.
    Open,
    /// `Authorization: Bearer <secret>` required.
    Token(String),
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("Open"),
            Self::Token(_) => f.write_str("Token(***)"),
        }
    }
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "none",
            Self::Token(_) => "token",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the JSON documents. `~` is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Callback entries kept in memory (default: 100).
    #[serde(default = "default_callback_capacity")]
    pub callback_capacity: usize,

    /// Callback entries returned by the history read (default: 20).
    #[serde(default = "default_callback_recent")]
    pub callback_recent: usize,

    /// Outbound events buffered per viewer before it is dropped (default: 64).
    #[serde(default = "default_viewer_buffer")]
    pub viewer_buffer: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            callback_capacity: default_callback_capacity(),
            callback_recent: default_callback_recent(),
            viewer_buffer: default_viewer_buffer(),
        }
    }
}

fn default_callback_capacity() -> usize {
    100
}

fn default_callback_recent() -> usize {
    20
}

fn default_viewer_buffer() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "command_center_canvas=debug").
    #[serde(default)]
    pub filters: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: None,
            filters: Vec::new(),
        }
    }
}

fn default_log_format() -> String {
    "plain".into()
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| CommandCenterError::Config(e.to_string()))?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .into_owned())
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;

        // Substitute ${ENV_VAR} references before parsing
        let substituted = substitute_env_vars(&raw)?;

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| CommandCenterError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        base_dir().join("config.json")
    }

    pub fn port(&self) -> u16 {
        self.server.as_ref().map(|s| s.port).unwrap_or_else(default_port)
    }

    pub fn bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    /// Data directory: config, then `DATA_DIR`, then `~/.command_center/data`.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .as_ref()
            .and_then(|s| s.data_dir.as_deref())
            .map(expand_path)
            .or_else(|| std::env::var("DATA_DIR").ok().map(|d| expand_path(&d)))
            .unwrap_or_else(|| base_dir().join("data"))
    }

    /// Static SPA directory: config, then `STATIC_DIR`.
    pub fn static_dir(&self) -> Option<PathBuf> {
        self.server
            .as_ref()
            .and_then(|s| s.static_dir.as_deref())
            .map(expand_path)
            .or_else(|| std::env::var("STATIC_DIR").ok().map(|d| expand_path(&d)))
    }

    pub fn canvas(&self) -> CanvasConfig {
        self.canvas.clone().unwrap_or_default()
    }

    /// Resolve how write endpoints are authenticated.
    ///
    /// Open mode must be requested with `mode: "none"`; a missing token is an
    /// error rather than a silent fallback to open access.
    pub fn auth_mode(&self) -> Result<AuthMode> {
        let auth = self.auth.clone().unwrap_or_default();
        match auth.mode.as_deref() {
            Some("none") => Ok(AuthMode::Open),
            Some("token") => auth.resolve_token().map(AuthMode::Token).ok_or_else(|| {
                CommandCenterError::Config(
                    "auth.mode is \"token\" but no token is configured".into(),
                )
            }),
            Some(other) => Err(CommandCenterError::Config(format!(
                "Unknown auth mode: {other}"
            ))),
            None => auth.resolve_token().map(AuthMode::Token).ok_or_else(|| {
                CommandCenterError::Config(format!(
                    "No API token configured: set auth.token, auth.token_env \
                     or {DEFAULT_TOKEN_ENV}, or set auth.mode to \"none\" \
                     to leave write endpoints open"
                ))
            }),
        }
    }
}

/// Base directory for config and data: `~/.command_center`.
pub fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".command_center")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only, single-threaded test runner
        unsafe { std::env::set_var("TEST_CC_TOKEN", "tok-123") };
        let input = r#"{"token": "${TEST_CC_TOKEN}", "other": "plain"}"#;
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("tok-123"));
        assert!(result.contains("plain"));
        unsafe { std::env::remove_var("TEST_CC_TOKEN") };
    }

    #[test]
    fn test_env_var_missing() {
        let input = r#"{"key": "${NONEXISTENT_VAR_CC_TEST}"}"#;
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains(r#""""#));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port(), 8000);
        assert_eq!(config.bind(), "0.0.0.0");
        let canvas = config.canvas();
        assert_eq!(canvas.callback_capacity, 100);
        assert_eq!(canvas.callback_recent, 20);
        assert_eq!(canvas.viewer_buffer, 64);
    }

    #[test]
    fn test_logging_default_matches_serde_default() {
        let built = LoggingConfig::default();
        let parsed: LoggingConfig = json5::from_str("{}").unwrap();
        assert_eq!(built.format, "plain");
        assert_eq!(parsed.format, built.format);
        assert!(built.level.is_none());
        assert!(built.filters.is_empty());
    }

    #[test]
    fn test_parse_json5() {
        let raw = r#"{
            // comments are allowed
            server: { port: 9100, static_dir: "/srv/app" },
            auth: { mode: "token", token: "abc" },
            canvas: { viewer_buffer: 8 },
        }"#;
        let config: Config = json5::from_str(raw).unwrap();
        assert_eq!(config.port(), 9100);
        assert_eq!(config.static_dir(), Some(PathBuf::from("/srv/app")));
        assert_eq!(config.canvas().viewer_buffer, 8);
        assert_eq!(config.canvas().callback_capacity, 100);
        assert_eq!(config.auth_mode().unwrap(), AuthMode::Token("abc".into()));
    }

    #[test]
    fn test_auth_mode_none_is_explicit() {
        let config = Config {
            auth: Some(AuthConfig {
                mode: Some("none".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(config.auth_mode().unwrap(), AuthMode::Open);
    }

    #[test]
    fn test_auth_mode_token_without_secret_fails() {
        let config = Config {
            auth: Some(AuthConfig {
                mode: Some("token".into()),
                token: None,
                token_env: Some("NONEXISTENT_CC_TOKEN_ENV".into()),
            }),
            ..Default::default()
        };
        assert!(config.auth_mode().is_err());
    }

    #[test]
    fn test_auth_mode_inferred_from_token_env() {
        // SAFETY: test-only, single-threaded test runner
        unsafe { std::env::set_var("TEST_CC_AUTH_ENV", "from-env") };
        let config = Config {
            auth: Some(AuthConfig {
                mode: None,
                token: None,
                token_env: Some("TEST_CC_AUTH_ENV".into()),
            }),
            ..Default::default()
        };
        assert_eq!(config.auth_mode().unwrap(), AuthMode::Token("from-env".into()));
        unsafe { std::env::remove_var("TEST_CC_AUTH_ENV") };
    }

    #[test]
    fn test_auth_mode_unknown() {
        let config = Config {
            auth: Some(AuthConfig {
                mode: Some("password".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.auth_mode().is_err());
    }

    #[test]
    fn test_auth_mode_debug_hides_secret() {
        let mode = AuthMode::Token("hunter2".into());
        assert_eq!(format!("{mode:?}"), "Token(***)");
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&tmp.path().join("nope.json")).unwrap();
        assert!(config.server.is_none());
    }
}
