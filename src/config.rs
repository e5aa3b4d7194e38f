//! Agent endpoint configuration and match settings
//!
//! Persisted as a JSON file. Loading is best-effort: a missing or malformed
//! file yields defaults, and every agent without all four fields is simply
//! never polled.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{BOARD_HEIGHT, BOARD_WIDTH, MIN_BOARD_SIDE};
use crate::error::ConfigError;
use crate::sim::movement::MovementKind;

/// Where one agent's decisions come from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentEndpoint {
    /// Service base URL, e.g. `https://api.example.com/v1`
    pub base_url: String,
    /// Request path appended to the base URL
    pub path: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Bearer credential
    pub api_key: String,
}

impl AgentEndpoint {
    /// All four fields are non-empty after trimming
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
            && !self.path.trim().is_empty()
            && !self.model.trim().is_empty()
            && !self.api_key.trim().is_empty()
    }

    /// Copy with surrounding whitespace removed from every field
    pub fn trimmed(&self) -> Self {
        Self {
            base_url: self.base_url.trim().to_string(),
            path: self.path.trim().to_string(),
            model: self.model.trim().to_string(),
            api_key: self.api_key.trim().to_string(),
        }
    }

    /// Base URL (without trailing slash) joined with the path
    pub fn url(&self) -> String {
        let base = self.base_url.trim();
        let base = base.strip_suffix('/').unwrap_or(base);
        let path = self.path.trim();
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

/// Optional outbound proxy for agent requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub url: String,
}

impl ProxyConfig {
    /// Proxy URL to use, if the toggle is on and a URL is present
    pub fn active_url(&self) -> Option<&str> {
        let url = self.url.trim();
        (self.enabled && !url.is_empty()).then_some(url)
    }
}

/// Tunables for one match that are not part of the endpoint store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    pub width: f32,
    pub height: f32,
    /// Seed for beacon placement and polling jitter
    pub seed: u64,
    pub movement: MovementKind,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
            seed: 0x5eed,
            movement: MovementKind::Eased,
        }
    }
}

impl MatchSettings {
    /// Copy with a board size the simulation can run on; a side that is
    /// not finite or smaller than `MIN_BOARD_SIDE` falls back to its default
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        let side = |value: f32, fallback: f32, name: &str| {
            if value.is_finite() && value >= MIN_BOARD_SIDE {
                value
            } else {
                log::warn!("Board {name} {value} unusable, using {fallback}");
                fallback
            }
        };
        Self {
            width: side(self.width, defaults.width, "width"),
            height: side(self.height, defaults.height, "height"),
            ..self
        }
    }
}

/// Everything the configuration store holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Agent 0 and agent 1
    pub models: [AgentEndpoint; 2],
    pub proxy: ProxyConfig,
    #[serde(rename = "match")]
    pub settings: MatchSettings,
}

impl ArenaConfig {
    /// True if at least one agent can be polled
    pub fn any_configured(&self) -> bool {
        self.models.iter().any(AgentEndpoint::is_configured)
    }

    /// Parse from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file, falling back to defaults on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path)
            .map_err(ConfigError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Using default config ({e})");
                Self::default()
            }
        }
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }
}
