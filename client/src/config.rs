//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:3001/ws";
pub const DEFAULT_EXECUTION_URL: &str = "https://emkc.org/api/v2/piston";
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 2;

pub const DEFAULT_AI_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const DEFAULT_AI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_AI_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_AI_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub relay_url: String,
    pub execution_url: String,
    /// Automatic reconnect attempts after an unexpected drop.
    pub reconnect_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_owned(),
            execution_url: DEFAULT_EXECUTION_URL.to_owned(),
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `COLLAB_RELAY_URL`: default `ws://127.0.0.1:3001/ws`
    /// - `COLLAB_EXECUTION_URL`: default Piston public API
    /// - `COLLAB_RECONNECT_ATTEMPTS`: default 2
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but unparseable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let relay_url = non_blank(lookup("COLLAB_RELAY_URL")).unwrap_or_else(|| DEFAULT_RELAY_URL.to_owned());
        let execution_url = non_blank(lookup("COLLAB_EXECUTION_URL"))
            .unwrap_or_else(|| DEFAULT_EXECUTION_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let reconnect_attempts =
            parse_or("COLLAB_RECONNECT_ATTEMPTS", lookup("COLLAB_RECONNECT_ATTEMPTS"), DEFAULT_RECONNECT_ATTEMPTS)?;

        Ok(Self { relay_url, execution_url, reconnect_attempts })
    }
}

// =============================================================================
// AI
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeouts: AiTimeouts,
}

impl AiConfig {
    /// Build typed AI config from environment variables.
    ///
    /// Required:
    /// - the variable named by `AI_API_KEY_ENV` (default `GOOGLE_API_KEY`)
    ///
    /// Optional:
    /// - `AI_MODEL`: default `gemini-1.5-flash`
    /// - `AI_BASE_URL`: default Gemini REST base URL
    /// - `AI_REQUEST_TIMEOUT_SECS`: default 120
    /// - `AI_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when no key is configured, which
    /// callers treat as "suggestions disabled".
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AiConfig::from_env`] with an injectable lookup.
    ///
    /// # Errors
    ///
    /// See [`AiConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let key_var = non_blank(lookup("AI_API_KEY_ENV")).unwrap_or_else(|| DEFAULT_AI_KEY_VAR.to_owned());
        let api_key = non_blank(lookup(&key_var)).ok_or(ConfigError::MissingApiKey { var: key_var })?;

        let model = non_blank(lookup("AI_MODEL")).unwrap_or_else(|| DEFAULT_AI_MODEL.to_owned());
        let base_url = non_blank(lookup("AI_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let timeouts = AiTimeouts {
            request_secs: parse_or(
                "AI_REQUEST_TIMEOUT_SECS",
                lookup("AI_REQUEST_TIMEOUT_SECS"),
                DEFAULT_AI_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_or(
                "AI_CONNECT_TIMEOUT_SECS",
                lookup("AI_CONNECT_TIMEOUT_SECS"),
                DEFAULT_AI_CONNECT_TIMEOUT_SECS,
            )?,
        };

        Ok(Self { api_key, model, base_url, timeouts })
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
