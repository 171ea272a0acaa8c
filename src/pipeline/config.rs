//! Engine configuration from environment variables

use super::names::{FallbackName, DEFAULT_FALLBACK_NAME};
use super::throttle::ThrottleRule;
use crate::config::ConfigError;
use std::collections::HashSet;
use std::env;

/// Configuration for the aggregation engine
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Topics whose messages are processed; anything else is dropped
    pub topics: Vec<String>,

    /// AIS message types dropped before throttling
    pub ignore_types: HashSet<i64>,

    pub throttle_rules: Vec<ThrottleRule>,

    /// Minimum seconds between two external lookups, across all vessels
    pub lookup_cooldown_secs: i64,

    pub fallback: FallbackName,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            ignore_types: HashSet::new(),
            throttle_rules: Vec::new(),
            lookup_cooldown_secs: 60,
            fallback: FallbackName::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `MQTT_TOPICS` (required, comma-separated)
    /// - `IGNORE_TYPES` (default: none, comma-separated integers)
    /// - `THROTTLE_RULES` (default: none, `ID:TYPE[:SECS]` comma-separated)
    /// - `LOOKUP_COOLDOWN_SECS` (default: 60)
    /// - `FALLBACK_NAME` (default: Unknown)
    /// - `FALLBACK_MODE` (default: sentinel, or `identifier`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let topics = split_list(
            &env::var("MQTT_TOPICS")
                .map_err(|_| ConfigError::MissingVariable("MQTT_TOPICS".to_string()))?,
        );
        if topics.is_empty() {
            return Err(ConfigError::InvalidValue("MQTT_TOPICS is empty".to_string()));
        }

        let ignore_types = parse_ignore_types(&env::var("IGNORE_TYPES").unwrap_or_default())?;

        let throttle_rules = ThrottleRule::parse_list(&env::var("THROTTLE_RULES").unwrap_or_default())
            .map_err(ConfigError::InvalidValue)?;

        let lookup_cooldown_secs = env::var("LOOKUP_COOLDOWN_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let fallback_name =
            env::var("FALLBACK_NAME").unwrap_or_else(|_| DEFAULT_FALLBACK_NAME.to_string());
        let fallback_mode = env::var("FALLBACK_MODE").unwrap_or_else(|_| "sentinel".to_string());
        let fallback = match fallback_mode.to_lowercase().as_str() {
            "sentinel" => FallbackName::Sentinel(fallback_name),
            "identifier" | "mmsi" => FallbackName::Identifier,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "FALLBACK_MODE must be 'sentinel' or 'identifier', got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            topics,
            ignore_types,
            throttle_rules,
            lookup_cooldown_secs,
            fallback,
        })
    }
}

pub(crate) fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_ignore_types(s: &str) -> Result<HashSet<i64>, ConfigError> {
    split_list(s)
        .iter()
        .map(|t| {
            t.parse::<i64>()
                .map_err(|_| ConfigError::InvalidValue(format!("IGNORE_TYPES entry '{}' is not an integer", t)))
        })
        .collect()
}
