//! SDK configuration
//!
//! [`SdkConfig`] collects the settings [`init`](crate::init) and
//! [`FlingSystem`](crate::FlingSystem) need. It can be built in code, parsed
//! from JSON, or read from `FLING_*` environment variables.

use std::time::Duration;

use fling_discovery::{DiscoveryConfig, SearchTarget};
use fling_state::logging::{LoggingMode, LOG_MODE_ENV};
use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// Environment variable naming a custom player service id
pub const SERVICE_ID_ENV: &str = "FLING_SERVICE_ID";

/// Environment variable setting the position update interval in milliseconds
pub const POSITION_INTERVAL_ENV: &str = "FLING_POSITION_INTERVAL_MS";

/// Environment variable toggling pause-on-background (`true`/`false`)
pub const PAUSE_ON_BACKGROUND_ENV: &str = "FLING_PAUSE_ON_BACKGROUND";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Which players discovery searches for
    /// Default: the built-in player
    pub discovery: DiscoveryConfig,

    /// Position update interval applied when a device's status listener is registered
    /// Default: none, the player's own default applies
    pub position_update_interval_ms: Option<u64>,

    /// Logging mode used by [`init`](crate::init)
    /// Default: silent
    pub log_mode: LoggingMode,

    /// Pause status subscriptions while the host is in the background
    /// Default: true
    pub pause_on_background: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            position_update_interval_ms: None,
            log_mode: LoggingMode::Silent,
            pause_on_background: true,
        }
    }
}

impl SdkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Development logging and one position update per second
    pub fn development() -> Self {
        Self {
            log_mode: LoggingMode::Development,
            position_update_interval_ms: Some(1000),
            ..Default::default()
        }
    }

    /// Search for a custom player instead of the built-in one
    pub fn custom_player(service_id: impl Into<String>) -> Self {
        Self {
            discovery: DiscoveryConfig::player(service_id),
            ..Default::default()
        }
    }

    pub fn position_update_interval(&self) -> Option<Duration> {
        self.position_update_interval_ms.map(Duration::from_millis)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), SdkError> {
        self.discovery.validate()?;

        if let Some(ms) = self.position_update_interval_ms {
            if ms == 0 {
                return Err(SdkError::Config(
                    "Position update interval must be greater than 0".to_string(),
                ));
            }
            if i64::try_from(ms).is_err() {
                return Err(SdkError::Config(format!(
                    "Position update interval out of range: {ms}"
                )));
            }
        }

        Ok(())
    }

    /// Parse and validate a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, SdkError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the `FLING_*` environment variables on top of the defaults
    pub fn from_env() -> Result<Self, SdkError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SdkError> {
        let mut config = Self::default();

        if let Some(mode) = lookup(LOG_MODE_ENV) {
            config.log_mode = LoggingMode::from_name(&mode)
                .ok_or_else(|| SdkError::Config(format!("{LOG_MODE_ENV}={mode}")))?;
        }

        if let Some(service_id) = lookup(SERVICE_ID_ENV) {
            config.discovery.search = SearchTarget::Player { service_id };
        }

        if let Some(interval) = lookup(POSITION_INTERVAL_ENV) {
            let ms = interval
                .trim()
                .parse()
                .map_err(|_| SdkError::Config(format!("{POSITION_INTERVAL_ENV}={interval}")))?;
            config.position_update_interval_ms = Some(ms);
        }

        if let Some(pause) = lookup(PAUSE_ON_BACKGROUND_ENV) {
            config.pause_on_background = match pause.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(SdkError::Config(format!(
                        "{PAUSE_ON_BACKGROUND_ENV}={pause}"
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SdkConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.pause_on_background);
        assert_eq!(config.position_update_interval(), None);
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let config = SdkConfig {
            position_update_interval_ms: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SdkError::Config(_))));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = SdkConfig::from_json_str(
            r#"{"log_mode":"development","position_update_interval_ms":500}"#,
        )
        .unwrap();

        assert_eq!(config.log_mode, LoggingMode::Development);
        assert_eq!(config.position_update_interval(), Some(Duration::from_millis(500)));
        assert_eq!(config.discovery, DiscoveryConfig::default());
        assert!(config.pause_on_background);
    }

    #[test]
    fn test_from_json_rejects_empty_service_id() {
        let result = SdkConfig::from_json_str(
            r#"{"discovery":{"search":{"kind":"player","service_id":""}}}"#,
        );
        assert!(matches!(result, Err(SdkError::Discovery(_))));
    }

    #[test]
    fn test_from_lookup() {
        let config = SdkConfig::from_lookup(lookup(&[
            (LOG_MODE_ENV, "debug"),
            (SERVICE_ID_ENV, "amzn.thin.pl"),
            (POSITION_INTERVAL_ENV, "250"),
            (PAUSE_ON_BACKGROUND_ENV, "false"),
        ]))
        .unwrap();

        assert_eq!(config.log_mode, LoggingMode::Debug);
        assert_eq!(config.discovery, DiscoveryConfig::player("amzn.thin.pl"));
        assert_eq!(config.position_update_interval_ms, Some(250));
        assert!(!config.pause_on_background);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        assert!(SdkConfig::from_lookup(lookup(&[(LOG_MODE_ENV, "loud")])).is_err());
        assert!(SdkConfig::from_lookup(lookup(&[(POSITION_INTERVAL_ENV, "soon")])).is_err());
        assert!(SdkConfig::from_lookup(lookup(&[(PAUSE_ON_BACKGROUND_ENV, "maybe")])).is_err());
    }
}
