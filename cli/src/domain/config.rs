//! Domain types and validators for atelier configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "engine.binary",
    "handshake.endpoint",
    "handshake.connect_timeout_secs",
    "handshake.startup_timeout_secs",
];

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.atelier/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AtelierConfig {
    /// Provisioning engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Agent handshake settings.
    #[serde(default)]
    pub handshake: HandshakeConfig,
}

/// Provisioning engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine CLI binary to drive (`infractl` by default).
    #[serde(default = "default_engine_binary")]
    pub binary: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: default_engine_binary(),
        }
    }
}

/// Agent handshake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// Base URL of the rendezvous endpoint agents report to.
    #[serde(default = "default_handshake_endpoint")]
    pub endpoint: String,
    /// How long to wait for the agent's first token presentation.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// How long to wait for the startup script after the token matched.
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_handshake_endpoint(),
            connect_timeout_secs: default_connect_timeout_secs(),
            startup_timeout_secs: default_startup_timeout_secs(),
        }
    }
}

fn default_engine_binary() -> String {
    "infractl".to_string()
}

fn default_handshake_endpoint() -> String {
    "http://127.0.0.1:7070".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    120
}

fn default_startup_timeout_secs() -> u64 {
    300
}

// ── Accessors ────────────────────────────────────────────────────────────────

impl AtelierConfig {
    /// Read a config value by dotted key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "engine.binary" => Some(self.engine.binary.clone()),
            "handshake.endpoint" => Some(self.handshake.endpoint.clone()),
            "handshake.connect_timeout_secs" => {
                Some(self.handshake.connect_timeout_secs.to_string())
            }
            "handshake.startup_timeout_secs" => {
                Some(self.handshake.startup_timeout_secs.to_string())
            }
            _ => None,
        }
    }

    /// Set a config value by dotted key. The key and value must already have
    /// passed [`validate_config_key`] and [`validate_config_value`].
    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "engine.binary" => self.engine.binary = value.to_string(),
            "handshake.endpoint" => self.handshake.endpoint = value.to_string(),
            "handshake.connect_timeout_secs" => {
                if let Ok(secs) = value.parse() {
                    self.handshake.connect_timeout_secs = secs;
                }
            }
            "handshake.startup_timeout_secs" => {
                if let Ok(secs) = value.parse() {
                    self.handshake.startup_timeout_secs = secs;
                }
            }
            _ => {}
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let valid = match key {
        "handshake.connect_timeout_secs" | "handshake.startup_timeout_secs" => {
            value.parse::<u64>().is_ok_and(|secs| secs > 0)
        }
        "handshake.endpoint" => value.starts_with("http://") || value.starts_with("https://"),
        _ => !value.is_empty(),
    };
    if !valid {
        let expected = match key {
            "handshake.connect_timeout_secs" | "handshake.startup_timeout_secs" => {
                "a positive integer number of seconds"
            }
            "handshake.endpoint" => "an http:// or https:// URL",
            _ => "a non-empty string",
        };
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            valid: expected.to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AtelierConfig::default();
        assert_eq!(cfg.engine.binary, "infractl");
        assert_eq!(cfg.handshake.connect_timeout_secs, 120);
        assert_eq!(cfg.handshake.startup_timeout_secs, 300);
    }

    #[test]
    fn every_valid_key_is_gettable() {
        let cfg = AtelierConfig::default();
        for key in VALID_CONFIG_KEYS {
            assert!(cfg.get(key).is_some(), "missing accessor for {key}");
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut cfg = AtelierConfig::default();
        cfg.set("engine.binary", "/usr/local/bin/infractl");
        cfg.set("handshake.connect_timeout_secs", "15");
        assert_eq!(
            cfg.get("engine.binary").as_deref(),
            Some("/usr/local/bin/infractl")
        );
        assert_eq!(cfg.get("handshake.connect_timeout_secs").as_deref(), Some("15"));
    }

    #[test]
    fn unknown_key_rejected() {
        let err = validate_config_key("nope.nope").unwrap_err();
        assert!(err.to_string().contains("Unknown setting"));
    }

    #[test]
    fn timeout_values_must_be_positive_integers() {
        assert!(validate_config_value("handshake.connect_timeout_secs", "30").is_ok());
        assert!(validate_config_value("handshake.connect_timeout_secs", "0").is_err());
        assert!(validate_config_value("handshake.connect_timeout_secs", "soon").is_err());
    }

    #[test]
    fn endpoint_must_be_http() {
        assert!(validate_config_value("handshake.endpoint", "http://localhost:7070").is_ok());
        assert!(validate_config_value("handshake.endpoint", "ftp://x").is_err());
    }
}
