//! # Neutron Configuration
//!
//! All tunables live in a single TOML document, loaded once at startup.
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [namer]
//! name_length = 16
//! min_code_point = 33
//! max_code_point = 126
//!
//! [loopback]
//! latency_ms = 0
//! unreliable_loss = 0.0
//! loss_seed = 0
//!
//! [lifecycle]
//! tick_rate = 60
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_MAX_CODE_POINT, DEFAULT_MIN_CODE_POINT, DEFAULT_NAME_LENGTH, DEFAULT_TICK_RATE,
};

/// Errors produced while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The document parsed but holds values that cannot work.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeutronConfig {
    /// Wire-name generation.
    pub namer: NamerConfig,
    /// In-process loopback host.
    pub loopback: LoopbackConfig,
    /// Built-in lifecycles.
    pub lifecycle: LifecycleConfig,
}

impl NeutronConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        self.namer.validate()?;
        self.loopback.validate()?;
        self.lifecycle.validate()
    }
}

/// Wire-name generation settings.
///
/// Both sides must run with identical values or their names diverge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamerConfig {
    /// Code points per generated name.
    pub name_length: usize,
    /// Lowest code point (inclusive).
    pub min_code_point: u32,
    /// Highest code point (inclusive).
    pub max_code_point: u32,
}

impl Default for NamerConfig {
    fn default() -> Self {
        Self {
            name_length: DEFAULT_NAME_LENGTH,
            min_code_point: DEFAULT_MIN_CODE_POINT,
            max_code_point: DEFAULT_MAX_CODE_POINT,
        }
    }
}

impl NamerConfig {
    /// Checks that names can be drawn from these settings.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for an empty name length, an inverted range,
    /// or a range holding values that are not `char`s.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name_length == 0 {
            return Err(ConfigError::Invalid("namer.name_length must be at least 1".into()));
        }
        if self.min_code_point > self.max_code_point {
            return Err(ConfigError::Invalid(format!(
                "namer.min_code_point ({}) exceeds namer.max_code_point ({})",
                self.min_code_point, self.max_code_point
            )));
        }
        // Every code point in the range must be a valid `char`.
        if self.max_code_point > u32::from(char::MAX)
            || (self.min_code_point <= 0xDFFF && self.max_code_point >= 0xD800)
        {
            return Err(ConfigError::Invalid(
                "namer code point range must hold only valid scalar values".into(),
            ));
        }
        Ok(())
    }
}

/// Loopback host settings (tests, demos).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// Artificial one-way delivery delay in milliseconds.
    pub latency_ms: u64,
    /// Probability (0.0 - 1.0) that an unreliable message is dropped.
    pub unreliable_loss: f64,
    /// Seed of the deterministic loss generator.
    pub loss_seed: u64,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            unreliable_loss: 0.0,
            loss_seed: 0,
        }
    }
}

impl LoopbackConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.unreliable_loss) {
            return Err(ConfigError::Invalid(format!(
                "loopback.unreliable_loss must be within 0.0..=1.0, got {}",
                self.unreliable_loss
            )));
        }
        Ok(())
    }
}

/// Built-in lifecycle settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Fires per second of the tick lifecycle.
    pub tick_rate: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

impl LifecycleConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("lifecycle.tick_rate must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = NeutronConfig::from_toml_str("").unwrap();
        assert_eq!(config, NeutronConfig::default());
        assert_eq!(config.namer.name_length, DEFAULT_NAME_LENGTH);
        assert_eq!(config.lifecycle.tick_rate, DEFAULT_TICK_RATE);
    }

    #[test]
    fn test_partial_sections() {
        let config = NeutronConfig::from_toml_str(
            r#"
            [namer]
            name_length = 8

            [loopback]
            unreliable_loss = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.namer.name_length, 8);
        assert_eq!(config.namer.min_code_point, DEFAULT_MIN_CODE_POINT);
        assert!((config.loopback.unreliable_loss - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.loopback.latency_ms, 0);
    }

    #[test]
    fn test_rejects_inverted_code_points() {
        let err = NeutronConfig::from_toml_str(
            r#"
            [namer]
            min_code_point = 100
            max_code_point = 50
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_surrogate_range() {
        let err = NeutronConfig::from_toml_str(
            r#"
            [namer]
            min_code_point = 55000
            max_code_point = 60000
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_loss_out_of_range() {
        let err = NeutronConfig::from_toml_str("[loopback]\nunreliable_loss = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_tick_rate() {
        let err = NeutronConfig::from_toml_str("[lifecycle]\ntick_rate = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = NeutronConfig::from_toml_str("[namer\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = NeutronConfig::from_file("/definitely/not/here/neutron.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
