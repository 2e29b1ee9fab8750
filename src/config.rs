use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BreakwaterError, Result};
use crate::login::CountingStrategy;
use crate::utils::get_env_with_prefix;

/// Detection configuration for a breakwater [`Detector`].
///
/// [`Detector`]: crate::Detector
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Trailing window, in seconds, over which failures are counted.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Detection settings for the source-IP dimension.
    #[serde(default = "default_ip_dimension")]
    pub ip: DimensionConfig,

    /// Detection settings for the username dimension.
    #[serde(default = "default_username_dimension")]
    pub username: DimensionConfig,

    /// Detection settings for the user-agent dimension.
    #[serde(default = "default_user_agent_dimension")]
    pub user_agent: DimensionConfig,

    /// Aggregate credential-stuffing settings.
    #[serde(default)]
    pub stuffing: StuffingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            ip: default_ip_dimension(),
            username: default_username_dimension(),
            user_agent: default_user_agent_dimension(),
            stuffing: StuffingConfig::default(),
        }
    }
}

impl Config {
    /// Create a new Config builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Create a strict configuration: lower thresholds, a more sensitive
    /// stuffing ratio.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            ip: DimensionConfig {
                threshold: 5,
                ..default_ip_dimension()
            },
            username: DimensionConfig {
                threshold: 5,
                ..default_username_dimension()
            },
            user_agent: DimensionConfig {
                threshold: 5,
                ..default_user_agent_dimension()
            },
            stuffing: StuffingConfig {
                failure_ratio: 0.5,
                min_samples: 30,
            },
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables use the `BREAKWATER_` prefix with an unprefixed fallback,
    /// e.g. `BREAKWATER_WINDOW_SECONDS`, `BREAKWATER_IP_THRESHOLD`,
    /// `BREAKWATER_STUFFING_FAILURE_RATIO`. Unparsable values keep their
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(window) = get_env_with_prefix("WINDOW_SECONDS") {
            if let Ok(value) = window.parse() {
                config.window_seconds = value;
            }
        }

        dimension_from_env("IP", &mut config.ip);
        dimension_from_env("USERNAME", &mut config.username);
        dimension_from_env("USER_AGENT", &mut config.user_agent);

        if let Some(ratio) = get_env_with_prefix("STUFFING_FAILURE_RATIO") {
            if let Ok(value) = ratio.parse() {
                config.stuffing.failure_ratio = value;
            }
        }
        if let Some(samples) = get_env_with_prefix("STUFFING_MIN_SAMPLES") {
            if let Ok(value) = samples.parse() {
                config.stuffing.min_samples = value;
            }
        }

        config
    }

    /// The trailing window as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    /// Check the invariants a detector needs to start.
    ///
    /// Bloom filter sizing is validated where the filters are built; this
    /// covers everything else.
    pub fn validate(&self) -> Result<()> {
        if self.window_seconds == 0 {
            return Err(BreakwaterError::configuration(
                "window_seconds must be positive",
            ));
        }
        if !(self.stuffing.failure_ratio > 0.0 && self.stuffing.failure_ratio < 1.0) {
            return Err(BreakwaterError::configuration(format!(
                "stuffing failure_ratio ({}) must be in (0, 1)",
                self.stuffing.failure_ratio
            )));
        }
        if self.stuffing.min_samples == 0 {
            return Err(BreakwaterError::configuration(
                "stuffing min_samples must be positive",
            ));
        }
        Ok(())
    }
}

/// Per-dimension detection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DimensionConfig {
    /// Failed-login count above which the dimension's rule fires
    /// (strictly greater-than).
    #[serde(default = "default_threshold")]
    pub threshold: u64,

    /// How login outcomes mutate this dimension's counter.
    #[serde(default = "default_strategy")]
    pub strategy: CountingStrategy,

    /// Expected number of flagged keys the registry is sized for.
    #[serde(default = "default_expected_insertions")]
    pub expected_insertions: u64,

    /// Target false-positive probability of the registry.
    #[serde(default = "default_fpp")]
    pub false_positive_probability: f64,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            strategy: default_strategy(),
            expected_insertions: default_expected_insertions(),
            false_positive_probability: default_fpp(),
        }
    }
}

/// Aggregate credential-stuffing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StuffingConfig {
    /// In-window failure ratio above which the global rule fires
    /// (strictly greater-than).
    #[serde(default = "default_failure_ratio")]
    pub failure_ratio: f64,

    /// Minimum in-window attempts before the ratio is considered meaningful.
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,
}

impl Default for StuffingConfig {
    fn default() -> Self {
        Self {
            failure_ratio: default_failure_ratio(),
            min_samples: default_min_samples(),
        }
    }
}

/// Builder for [`Config`].
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the trailing window in seconds.
    pub fn window_seconds(mut self, seconds: u64) -> Self {
        self.config.window_seconds = seconds;
        self
    }

    /// Replace the IP dimension settings.
    pub fn ip(mut self, dimension: DimensionConfig) -> Self {
        self.config.ip = dimension;
        self
    }

    /// Replace the username dimension settings.
    pub fn username(mut self, dimension: DimensionConfig) -> Self {
        self.config.username = dimension;
        self
    }

    /// Replace the user-agent dimension settings.
    pub fn user_agent(mut self, dimension: DimensionConfig) -> Self {
        self.config.user_agent = dimension;
        self
    }

    /// Set the IP rule threshold.
    pub fn ip_threshold(mut self, threshold: u64) -> Self {
        self.config.ip.threshold = threshold;
        self
    }

    /// Set the username rule threshold.
    pub fn username_threshold(mut self, threshold: u64) -> Self {
        self.config.username.threshold = threshold;
        self
    }

    /// Set the user-agent rule threshold.
    pub fn user_agent_threshold(mut self, threshold: u64) -> Self {
        self.config.user_agent.threshold = threshold;
        self
    }

    /// Replace the credential-stuffing settings.
    pub fn stuffing(mut self, stuffing: StuffingConfig) -> Self {
        self.config.stuffing = stuffing;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn dimension_from_env(name: &str, dimension: &mut DimensionConfig) {
    if let Some(threshold) = get_env_with_prefix(&format!("{}_THRESHOLD", name)) {
        if let Ok(value) = threshold.parse() {
            dimension.threshold = value;
        }
    }
    if let Some(strategy) = get_env_with_prefix(&format!("{}_COUNTING_STRATEGY", name)) {
        if let Some(value) = parse_strategy(&strategy) {
            dimension.strategy = value;
        }
    }
    if let Some(insertions) = get_env_with_prefix(&format!("{}_EXPECTED_INSERTIONS", name)) {
        if let Ok(value) = insertions.parse() {
            dimension.expected_insertions = value;
        }
    }
    if let Some(fpp) = get_env_with_prefix(&format!("{}_FALSE_POSITIVE_PROBABILITY", name)) {
        if let Ok(value) = fpp.parse() {
            dimension.false_positive_probability = value;
        }
    }
}

fn parse_strategy(value: &str) -> Option<CountingStrategy> {
    match value {
        "consecutive_fails" => Some(CountingStrategy::ConsecutiveFails),
        "total_fails" => Some(CountingStrategy::TotalFails),
        _ => None,
    }
}

fn default_window_seconds() -> u64 {
    300
}

fn default_threshold() -> u64 {
    10
}

fn default_strategy() -> CountingStrategy {
    CountingStrategy::TotalFails
}

fn default_expected_insertions() -> u64 {
    100_000
}

fn default_fpp() -> f64 {
    1e-4
}

fn default_failure_ratio() -> f64 {
    0.75
}

fn default_min_samples() -> u64 {
    50
}

fn default_ip_dimension() -> DimensionConfig {
    DimensionConfig {
        expected_insertions: 1_000_000,
        ..DimensionConfig::default()
    }
}

fn default_username_dimension() -> DimensionConfig {
    // A legitimate user logging in resets their own streak
    DimensionConfig {
        strategy: CountingStrategy::ConsecutiveFails,
        ..DimensionConfig::default()
    }
}

fn default_user_agent_dimension() -> DimensionConfig {
    DimensionConfig {
        expected_insertions: 50_000,
        ..DimensionConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_seconds, 300);
        assert_eq!(config.ip.threshold, 10);
        assert_eq!(config.ip.expected_insertions, 1_000_000);
        assert_eq!(config.username.strategy, CountingStrategy::ConsecutiveFails);
        assert_eq!(config.user_agent.strategy, CountingStrategy::TotalFails);
        assert_eq!(config.stuffing.failure_ratio, 0.75);
        assert_eq!(config.stuffing.min_samples, 50);
    }

    #[test]
    fn test_strict_config() {
        let config = Config::strict();
        assert_eq!(config.ip.threshold, 5);
        assert_eq!(config.username.threshold, 5);
        assert_eq!(config.stuffing.failure_ratio, 0.5);
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .window_seconds(120)
            .ip_threshold(3)
            .username_threshold(4)
            .user_agent_threshold(5)
            .stuffing(StuffingConfig {
                failure_ratio: 0.9,
                min_samples: 200,
            })
            .build();

        assert_eq!(config.window_seconds, 120);
        assert_eq!(config.ip.threshold, 3);
        assert_eq!(config.username.threshold, 4);
        assert_eq!(config.user_agent.threshold, 5);
        assert_eq!(config.stuffing.failure_ratio, 0.9);
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let config = Config::builder().window_seconds(0).build();
        assert!(config.validate().is_err());

        let config = Config::builder()
            .stuffing(StuffingConfig {
                failure_ratio: 1.5,
                min_samples: 50,
            })
            .build();
        assert!(config.validate().is_err());

        let config = Config::builder()
            .stuffing(StuffingConfig {
                failure_ratio: 0.5,
                min_samples: 0,
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("BREAKWATER_WINDOW_SECONDS", "60");
        std::env::set_var("BREAKWATER_IP_THRESHOLD", "7");
        std::env::set_var("BREAKWATER_USERNAME_COUNTING_STRATEGY", "total_fails");
        std::env::set_var("BREAKWATER_STUFFING_FAILURE_RATIO", "0.6");

        let config = Config::from_env();
        assert_eq!(config.window_seconds, 60);
        assert_eq!(config.ip.threshold, 7);
        assert_eq!(config.username.strategy, CountingStrategy::TotalFails);
        assert_eq!(config.stuffing.failure_ratio, 0.6);

        std::env::remove_var("BREAKWATER_WINDOW_SECONDS");
        std::env::remove_var("BREAKWATER_IP_THRESHOLD");
        std::env::remove_var("BREAKWATER_USERNAME_COUNTING_STRATEGY");
        std::env::remove_var("BREAKWATER_STUFFING_FAILURE_RATIO");
    }

    #[test]
    fn test_serde_round_trip() {
        let config = Config::strict();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.ip.threshold, 5);
        assert_eq!(parsed.stuffing.min_samples, 30);
    }

    #[test]
    fn test_serde_defaults_for_missing_fields() {
        let parsed: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.window_seconds, 300);
        assert_eq!(parsed.ip.expected_insertions, 1_000_000);
    }
}
