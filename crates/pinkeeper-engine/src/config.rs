//! Configuration for the archival engine
//!
//! Defines pin thresholds, the outbound message size limit and the periodic
//! sweep interval.

use crate::EngineError;
use pinkeeper_domain::{DEFAULT_MAX_PINS, MAX_PINS_CAP};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest message body the platform accepts
pub const PLATFORM_MAX_CONTENT_CHARS: usize = 2000;

/// Configuration for the archival engine
///
/// # Examples
///
/// ```
/// use pinkeeper_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.default_max_pins, 40);
///
/// let config = EngineConfig::strict();
/// assert_eq!(config.default_max_pins, 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Threshold for guilds that have not configured `maxPins`
    /// Default: 40
    #[serde(default = "default_max_pins")]
    pub default_max_pins: u32,

    /// Largest threshold a guild override may set; larger stored values fall
    /// back to `default_max_pins`
    /// Default: 49
    #[serde(default = "default_max_pins_cap")]
    pub max_pins_cap: u32,

    /// Maximum characters per archived message part
    /// Default: 2000
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Minutes between periodic sweeps of the configured guilds (0 disables)
    /// Default: 0
    #[serde(default)]
    pub sweep_interval_minutes: u64,

    /// Dry-run mode: log what would be archived without sending or unpinning
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

fn default_max_pins() -> u32 {
    DEFAULT_MAX_PINS
}

fn default_max_pins_cap() -> u32 {
    MAX_PINS_CAP
}

fn default_max_content_chars() -> usize {
    PLATFORM_MAX_CONTENT_CHARS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_pins: DEFAULT_MAX_PINS,
            max_pins_cap: MAX_PINS_CAP,
            max_content_chars: PLATFORM_MAX_CONTENT_CHARS,
            sweep_interval_minutes: 0,
            dry_run: false,
        }
    }
}

impl EngineConfig {
    /// Smaller default threshold for busy deployments
    pub fn strict() -> Self {
        Self {
            default_max_pins: 20,
            ..Self::default()
        }
    }

    /// Check the invariants the engine relies on
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_pins_cap > MAX_PINS_CAP {
            return Err(EngineError::Config(format!(
                "max_pins_cap must be at most {}, got {}",
                MAX_PINS_CAP, self.max_pins_cap
            )));
        }
        if self.default_max_pins > self.max_pins_cap {
            return Err(EngineError::Config(format!(
                "default_max_pins ({}) exceeds max_pins_cap ({})",
                self.default_max_pins, self.max_pins_cap
            )));
        }
        if self.max_content_chars == 0 || self.max_content_chars > PLATFORM_MAX_CONTENT_CHARS {
            return Err(EngineError::Config(format!(
                "max_content_chars must be within 1..={}, got {}",
                PLATFORM_MAX_CONTENT_CHARS, self.max_content_chars
            )));
        }
        Ok(())
    }

    /// Sweep interval as a Duration, `None` when periodic sweeps are off
    pub fn sweep_interval(&self) -> Option<Duration> {
        if self.sweep_interval_minutes == 0 {
            None
        } else {
            Some(Duration::from_secs(self.sweep_interval_minutes * 60))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.default_max_pins, 40);
        assert_eq!(config.max_pins_cap, 49);
        assert_eq!(config.max_content_chars, 2000);
        assert_eq!(config.sweep_interval(), None);
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_config() {
        let config = EngineConfig::strict();
        assert_eq!(config.default_max_pins, 20);
        assert!(config.default_max_pins < EngineConfig::default().default_max_pins);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_default_above_cap() {
        let config = EngineConfig {
            default_max_pins: 45,
            max_pins_cap: 30,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_cap_above_platform() {
        let config = EngineConfig {
            max_pins_cap: 50,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_content_limit() {
        let config = EngineConfig {
            max_content_chars: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sweep_interval() {
        let config = EngineConfig {
            sweep_interval_minutes: 15,
            ..Default::default()
        };
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str("dry_run = true").unwrap();
        assert!(config.dry_run);
        assert_eq!(config.default_max_pins, 40);
        assert_eq!(config.max_content_chars, 2000);
    }
}
