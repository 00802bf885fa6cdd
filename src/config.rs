use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::ScoringWeights;
use crate::session::SearchLimits;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String { "http://localhost:2000".to_string() }
fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_result_cap")]
    pub result_cap: usize,
    #[serde(default = "default_load_more_cap")]
    pub load_more_cap: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            result_cap: default_result_cap(),
            load_more_cap: default_load_more_cap(),
        }
    }
}

impl From<&SearchSettings> for SearchLimits {
    fn from(value: &SearchSettings) -> Self {
        SearchLimits {
            result_cap: value.result_cap,
            load_more_cap: value.load_more_cap,
        }
    }
}

fn default_result_cap() -> usize { 20 }
fn default_load_more_cap() -> usize { 40 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_condition_weight")]
    pub condition: f64,
    #[serde(default = "default_gender_weight")]
    pub gender: f64,
    #[serde(default = "default_age_weight")]
    pub age: f64,
    #[serde(default = "default_proximity_weight")]
    pub proximity: f64,
    #[serde(default = "default_compensation_weight")]
    pub compensation: f64,
    #[serde(default = "default_proximity_floor")]
    pub proximity_floor: f64,
    #[serde(default = "default_compensation_partial_cap")]
    pub compensation_partial_cap: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            condition: default_condition_weight(),
            gender: default_gender_weight(),
            age: default_age_weight(),
            proximity: default_proximity_weight(),
            compensation: default_compensation_weight(),
            proximity_floor: default_proximity_floor(),
            compensation_partial_cap: default_compensation_partial_cap(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(value: &WeightsConfig) -> Self {
        ScoringWeights {
            condition: value.condition,
            gender: value.gender,
            age: value.age,
            proximity: value.proximity,
            compensation: value.compensation,
            proximity_floor: value.proximity_floor,
            compensation_partial_cap: value.compensation_partial_cap,
        }
    }
}

fn default_condition_weight() -> f64 { 50.0 }
fn default_gender_weight() -> f64 { 15.0 }
fn default_age_weight() -> f64 { 15.0 }
fn default_proximity_weight() -> f64 { 20.0 }
fn default_compensation_weight() -> f64 { 10.0 }
fn default_proximity_floor() -> f64 { 5.0 }
fn default_compensation_partial_cap() -> f64 { 9.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

fn default_store_path() -> String { ".trial-match".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with TRIALMATCH__)
    /// 5. TRIAL_API_URL for the search backend address
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., TRIALMATCH__API__BASE_URL -> api.base_url
            .add_source(env_source())
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        settings.try_deserialize()
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights::from(&self.scoring.weights)
    }

    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits::from(&self.search)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("TRIALMATCH")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Convenience variables that override nested keys
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Ok(base_url) = std::env::var("TRIAL_API_URL") {
        builder = builder.set_override("api.base_url", base_url)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_weights() {
        let weights = ScoringWeights::from(&WeightsConfig::default());
        assert_eq!(weights, ScoringWeights::default());
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_load_from_file_fills_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://trials.test\"\n\n[scoring.weights]\ncondition = 40.0").unwrap();

        let settings = Settings::load_from(file.path()).unwrap();

        assert_eq!(settings.api.base_url, "http://trials.test");
        assert_eq!(settings.api.timeout_secs, 30);
        assert_eq!(settings.scoring_weights().condition, 40.0);
        assert_eq!(settings.scoring_weights().proximity, 20.0);
        assert_eq!(settings.search_limits(), SearchLimits::default());
    }
}
