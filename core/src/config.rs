//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides. Tests use `EngineConfig::default()`.

use serde::{Deserialize, Serialize};

/// No round allocation ever holds more targets than this.
pub const MAX_TARGETS_PER_ROUND: usize = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Targets per round allocation, 1 to `MAX_TARGETS_PER_ROUND`.
    pub max_targets_per_round: usize,
    /// Statutory minimum interval before an item may be disputed again.
    pub lock_period_days: i64,
    /// How long a bureau has to answer before the next round may begin.
    pub response_window_days: i64,
    pub detection: DetectionConfig,
    pub rate_limit: RateLimitConfig,
}

/// Thresholds used by the conflict detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    pub retention_years: i64,
    pub bankruptcy_retention_years: i64,
    /// The reporting clock starts this many days after first delinquency.
    pub delinquency_grace_days: i64,
    /// Cross-source amount differences at or under this are ignored.
    pub balance_tolerance: f64,
    pub reaging_tolerance_days: i64,
    pub stale_reporting_days: i64,
    pub medical_debt_threshold: f64,
    pub medical_seasoning_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_calls: u32,
    pub window_secs: i64,
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_targets_per_round: MAX_TARGETS_PER_ROUND,
            lock_period_days: 30,
            response_window_days: 30,
            detection: DetectionConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            retention_years: 7,
            bankruptcy_retention_years: 10,
            delinquency_grace_days: 180,
            balance_tolerance: 1.0,
            reaging_tolerance_days: 30,
            stale_reporting_days: 90,
            medical_debt_threshold: 500.0,
            medical_seasoning_days: 365,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_calls: 20,
            window_secs: 60,
            cache_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Load overrides from a JSON file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_TARGETS_PER_ROUND).contains(&self.max_targets_per_round) {
            anyhow::bail!(
                "max_targets_per_round must be between 1 and {MAX_TARGETS_PER_ROUND}, got {}",
                self.max_targets_per_round
            );
        }
        if self.lock_period_days < 0 || self.response_window_days < 0 {
            anyhow::bail!("lock_period_days and response_window_days must be non-negative");
        }
        if self.rate_limit.enabled && self.rate_limit.cache_capacity == 0 {
            anyhow::bail!("rate_limit.cache_capacity must be at least 1 when enabled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "lock_period_days": 45, "detection": { "balance_tolerance": 5.0 } }"#)
                .unwrap();
        assert_eq!(config.lock_period_days, 45);
        assert_eq!(config.max_targets_per_round, 7);
        assert_eq!(config.detection.balance_tolerance, 5.0);
        assert_eq!(config.detection.retention_years, 7);
        assert!(!config.rate_limit.enabled);
    }

    #[test]
    fn shipped_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/engine_config.json");
        let config = EngineConfig::load(path).unwrap();
        assert!(config.rate_limit.enabled);
        assert_eq!(config.detection, DetectionConfig::default());
    }

    #[test]
    fn zero_cap_is_rejected() {
        let config = EngineConfig { max_targets_per_round: 0, ..EngineConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn cap_above_seven_is_rejected() {
        let config: EngineConfig = serde_json::from_str(r#"{ "max_targets_per_round": 12 }"#).unwrap();
        assert!(config.validate().is_err());
        let config = EngineConfig { max_targets_per_round: 3, ..EngineConfig::default() };
        assert!(config.validate().is_ok());
    }
}
