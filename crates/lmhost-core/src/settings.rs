//! Settings domain types and validation.
//!
//! Settings are supplied by the host (CLI flags, an editor's configuration
//! store, environment). The core only reads them.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default loopback port for the managed server.
///
/// Deliberately one above the upstream default (11434) so a user's own
/// server install keeps its port.
pub const DEFAULT_SERVER_PORT: u16 = 11435;

/// Host-provided settings.
///
/// All fields are optional to support partial configuration and defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Port override for the managed server.
    pub port: Option<u16>,

    /// Model used when a caller does not name one.
    pub default_model: Option<String>,

    /// Override for the data root (models, managed binaries).
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    /// Read settings from `LMHOST_PORT`, `LMHOST_DEFAULT_MODEL` and
    /// `LMHOST_DATA_DIR`. Unparseable ports are ignored.
    pub fn from_env() -> Self {
        Self {
            port: env::var("LMHOST_PORT").ok().and_then(|v| v.trim().parse().ok()),
            default_model: env::var("LMHOST_DEFAULT_MODEL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            data_dir: env::var_os("LMHOST_DATA_DIR").map(PathBuf::from),
        }
    }

    /// Get the effective server port (with default fallback).
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None => DEFAULT_SERVER_PORT,
        }
    }

    /// Loopback base URL for the effective port.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.effective_port())
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("Default model name cannot be empty")]
    EmptyDefaultModel,
}

/// Validate settings before they are used to build an engine.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(port) = settings.port {
        if port < 1024 {
            return Err(SettingsError::InvalidPort(port));
        }
    }

    if let Some(ref model) = settings.default_model {
        if model.trim().is_empty() {
            return Err(SettingsError::EmptyDefaultModel);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_differs_from_upstream() {
        let settings = Settings::default();
        assert_eq!(settings.effective_port(), DEFAULT_SERVER_PORT);
        assert_ne!(settings.effective_port(), 11434);
        assert_eq!(settings.base_url(), "http://127.0.0.1:11435");
    }

    #[test]
    fn test_port_override() {
        let settings = Settings {
            port: Some(18080),
            ..Settings::default()
        };
        assert_eq!(settings.base_url(), "http://127.0.0.1:18080");
    }

    #[test]
    fn test_validate_rejects_privileged_port() {
        let settings = Settings {
            port: Some(80),
            ..Settings::default()
        };
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::InvalidPort(80))
        );
    }

    #[test]
    fn test_validate_rejects_blank_model() {
        let settings = Settings {
            default_model: Some("  ".into()),
            ..Settings::default()
        };
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::EmptyDefaultModel)
        );
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let settings: Settings = serde_json::from_str(r#"{"port": 12000}"#).unwrap();
        assert_eq!(settings.port, Some(12000));
        assert_eq!(settings.default_model, None);
    }
}
