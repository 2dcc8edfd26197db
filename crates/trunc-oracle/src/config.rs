use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{OracleError, OracleResult};
use crate::interfaces::Identity;

/// Oracle configuration loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OracleConfig {
    /// Identity allowed to enable markets and record observations
    pub update_source: Identity,

    /// Identity allowed to change policy, pause auto-tune and grow history
    pub governance: Identity,

    /// `cardinality_next` applied when a market is enabled
    #[serde(default = "default_initial_cardinality")]
    pub initial_cardinality_next: u16,

    /// Minimum cap change, in ppm of the old cap, that emits `CapUpdated`
    #[serde(default = "default_dead_band")]
    pub cap_event_dead_band_ppm: u32,

    /// Fallbacks for policy parameters the store leaves unset
    #[serde(default)]
    pub policy_defaults: PolicyDefaults,
}

/// Default value for each governance policy parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyDefaults {
    pub initial_cap: u32,
    pub min_cap: u32,
    pub max_cap: u32,
    pub step_ppm: u32,
    pub budget_ppm: u32,
    pub decay_window: u32,
    pub update_interval: u32,
}

fn default_initial_cardinality() -> u16 {
    DEFAULT_INITIAL_CARDINALITY
}

fn default_dead_band() -> u32 {
    DEFAULT_CAP_EVENT_DEAD_BAND_PPM
}

impl OracleConfig {
    /// Config with the given identities and default everything else
    pub fn new(update_source: Identity, governance: Identity) -> Self {
        Self {
            update_source,
            governance,
            initial_cardinality_next: DEFAULT_INITIAL_CARDINALITY,
            cap_event_dead_band_ppm: DEFAULT_CAP_EVENT_DEAD_BAND_PPM,
            policy_defaults: PolicyDefaults::default(),
        }
    }

    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> OracleResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            OracleError::InvalidConfig(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> OracleResult<Self> {
        let config: OracleConfig = toml::from_str(content)
            .map_err(|e| OracleError::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> OracleResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| OracleError::InvalidConfig(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content).map_err(|e| {
            OracleError::InvalidConfig(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> OracleResult<()> {
        if self.update_source.as_str().is_empty() {
            return Err(OracleError::InvalidConfig(
                "update_source must not be empty".to_string(),
            ));
        }
        if self.governance.as_str().is_empty() {
            return Err(OracleError::InvalidConfig(
                "governance must not be empty".to_string(),
            ));
        }
        if self.initial_cardinality_next == 0 {
            return Err(OracleError::InvalidConfig(
                "initial_cardinality_next must be greater than 0".to_string(),
            ));
        }
        if self.cap_event_dead_band_ppm as u64 > PPM {
            return Err(OracleError::InvalidConfig(format!(
                "cap_event_dead_band_ppm {} exceeds {}",
                self.cap_event_dead_band_ppm, PPM
            )));
        }
        self.policy_defaults.validate()
    }
}

impl PolicyDefaults {
    /// The defaults must form a valid policy on their own
    fn validate(&self) -> OracleResult<()> {
        let d = self;
        let checks: [(bool, &str); 5] = [
            (d.step_ppm == 0, "step_ppm must be greater than 0"),
            (d.min_cap == 0, "min_cap must be greater than 0"),
            (d.max_cap < d.min_cap, "max_cap must be at least min_cap"),
            (d.max_cap > MAX_CAP_TICKS, "max_cap exceeds the tick range"),
            (d.decay_window == 0, "decay_window must be greater than 0"),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, reason)) => Err(OracleError::InvalidConfig(format!(
                "policy_defaults: {}",
                reason
            ))),
            None => Ok(()),
        }
    }
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            initial_cap: DEFAULT_INITIAL_CAP,
            min_cap: DEFAULT_MIN_CAP,
            max_cap: DEFAULT_MAX_CAP,
            step_ppm: DEFAULT_STEP_PPM,
            budget_ppm: DEFAULT_BUDGET_PPM,
            decay_window: DEFAULT_DECAY_WINDOW,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self::new(Identity::new("update-source"), Identity::new("governance"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OracleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy_defaults.initial_cap, 50);
        assert_eq!(config.policy_defaults.update_interval, 3_600);
        assert_eq!(config.cap_event_dead_band_ppm, 5_000);
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config = OracleConfig::from_toml_str(
            r#"
            update_source = "hook"
            governance = "dao"

            [policy_defaults]
            max_cap = 400
            "#,
        )
        .unwrap();

        assert_eq!(config.update_source.as_str(), "hook");
        assert_eq!(config.initial_cardinality_next, DEFAULT_INITIAL_CARDINALITY);
        assert_eq!(config.policy_defaults.max_cap, 400);
        assert_eq!(config.policy_defaults.min_cap, DEFAULT_MIN_CAP);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = OracleConfig::from_toml_str(
            r#"
            update_source = "hook"
            governance = "dao"
            initial_cardinality_next = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, OracleError::InvalidConfig(_)));

        let mut config = OracleConfig::default();
        config.policy_defaults.min_cap = 20;
        config.policy_defaults.max_cap = 10;
        assert!(config.validate().is_err());

        assert!(OracleConfig::from_toml_str("not toml at all =").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("trunc-oracle-config-{}.toml", std::process::id()));
        let mut config = OracleConfig::default();
        config.initial_cardinality_next = 64;
        config.save(&path).unwrap();

        let loaded = OracleConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = fs::remove_file(&path);
    }
}
