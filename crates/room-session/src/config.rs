//! Room session configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults. Credentials are not configuration; they are passed to
//! `SessionController::join` per session.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default lifetime of a transient connection-state notice in seconds.
pub const DEFAULT_NOTICE_TTL_SECONDS: u64 = 3;

/// Default buffer size for the controller command mailbox.
pub const DEFAULT_COMMAND_BUFFER: usize = 64;

/// Default buffer size the transport should use for its event stream.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Default client instance id prefix.
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "rs";

/// Room session configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a transient notice banner stays up before auto-dismiss.
    pub notice_ttl: Duration,

    /// Controller command mailbox depth.
    pub command_buffer: usize,

    /// Suggested transport event stream depth.
    pub event_buffer: usize,

    /// Unique identifier for this client instance (log correlation).
    pub client_id: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notice_ttl: Duration::from_secs(DEFAULT_NOTICE_TTL_SECONDS),
            command_buffer: DEFAULT_COMMAND_BUFFER,
            event_buffer: DEFAULT_EVENT_BUFFER,
            client_id: generate_client_id(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let notice_ttl_seconds = parse_var(vars, "ROOM_NOTICE_TTL_SECONDS")?
            .unwrap_or(DEFAULT_NOTICE_TTL_SECONDS);

        let command_buffer =
            parse_var(vars, "ROOM_COMMAND_BUFFER")?.unwrap_or(DEFAULT_COMMAND_BUFFER);

        let event_buffer = parse_var(vars, "ROOM_EVENT_BUFFER")?.unwrap_or(DEFAULT_EVENT_BUFFER);

        let client_id = vars
            .get("ROOM_CLIENT_ID")
            .cloned()
            .unwrap_or_else(generate_client_id);

        Ok(Config {
            notice_ttl: Duration::from_secs(notice_ttl_seconds),
            command_buffer,
            event_buffer,
            client_id,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    match vars.get(name) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw.clone(),
        }),
    }
}

fn generate_client_id() -> String {
    let suffix = uuid::Uuid::new_v4().to_string();
    let short = suffix.get(..8).unwrap_or("00000000");
    format!("{DEFAULT_CLIENT_ID_PREFIX}-{short}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("defaults should load");

        assert_eq!(
            config.notice_ttl,
            Duration::from_secs(DEFAULT_NOTICE_TTL_SECONDS)
        );
        assert_eq!(config.command_buffer, DEFAULT_COMMAND_BUFFER);
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER);
        assert!(config.client_id.starts_with("rs-"));
    }

    #[test]
    fn test_from_vars_custom_values() {
        let vars = HashMap::from([
            ("ROOM_NOTICE_TTL_SECONDS".to_string(), "5".to_string()),
            ("ROOM_COMMAND_BUFFER".to_string(), "16".to_string()),
            ("ROOM_EVENT_BUFFER".to_string(), "512".to_string()),
            ("ROOM_CLIENT_ID".to_string(), "rs-custom-001".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("config should load");

        assert_eq!(config.notice_ttl, Duration::from_secs(5));
        assert_eq!(config.command_buffer, 16);
        assert_eq!(config.event_buffer, 512);
        assert_eq!(config.client_id, "rs-custom-001");
    }

    #[test]
    fn test_from_vars_invalid_value() {
        let vars = HashMap::from([("ROOM_NOTICE_TTL_SECONDS".to_string(), "soon".to_string())]);

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { name, .. }) if name == "ROOM_NOTICE_TTL_SECONDS")
        );
    }
}
