//! Relay configuration parsed from environment variables.

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Bound on each connection's outbound queue. Peers that fall this far
    /// behind miss broadcasts instead of stalling the room.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { host: DEFAULT_HOST.to_owned(), port: DEFAULT_PORT, channel_capacity: DEFAULT_CHANNEL_CAPACITY }
    }
}

impl RelayConfig {
    /// Build typed relay config from environment variables.
    ///
    /// Optional:
    /// - `RELAY_HOST`: default `0.0.0.0`
    /// - `PORT`: default 3001
    /// - `RELAY_CHANNEL_CAPACITY`: default 256, must be positive
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RelayConfig::from_env`] with an injectable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but unparseable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("RELAY_HOST")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let channel_capacity = parse_or("RELAY_CHANNEL_CAPACITY", lookup("RELAY_CHANNEL_CAPACITY"), DEFAULT_CHANNEL_CAPACITY)?;
        if channel_capacity == 0 {
            return Err(ConfigError::Invalid { key: "RELAY_CHANNEL_CAPACITY", value: "0".into() });
        }

        Ok(Self { host, port, channel_capacity })
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
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

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
