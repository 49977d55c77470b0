//! Discovery configuration

use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// Which players to search for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchTarget {
    /// The player built into the device
    #[default]
    DefaultPlayer,
    /// A custom player registered under `service_id`
    Player { service_id: String },
}

/// Configuration for a [`DiscoveryNormalizer`](crate::DiscoveryNormalizer)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub search: SearchTarget,
}

impl DiscoveryConfig {
    /// Search for the built-in player
    pub fn default_player() -> Self {
        Self::default()
    }

    /// Search for a custom player
    pub fn player(service_id: impl Into<String>) -> Self {
        Self {
            search: SearchTarget::Player {
                service_id: service_id.into(),
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match &self.search {
            SearchTarget::Player { service_id } if service_id.trim().is_empty() => Err(
                DiscoveryError::InvalidTarget("service_id must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }
}
