//! Configuration loading from TOML files
//!
//! The binary picks the file from `--config`, then the `CONFIG_FILE`
//! environment variable, then `config/dev.toml`. A missing or invalid file
//! falls back to defaults.

use crate::domain::types::FacilityId;
use crate::domain::zone::ZoneLayout;
use crate::services::alerts::AlertSettings;
use crate::services::monitor::MonitorSettings;
use crate::services::pressure::AnalysisSettings;
use crate::services::queue_store::QueueSettings;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_max_queue_length")]
    pub max_queue_length: usize,
    /// Service time per person in minutes
    #[serde(default = "default_minutes_per_person")]
    pub minutes_per_person: u32,
    /// Per-zone override of `minutes_per_person`
    #[serde(default)]
    pub zone_minutes: HashMap<String, u32>,
}

fn default_max_queue_length() -> usize {
    50
}

fn default_minutes_per_person() -> u32 {
    2
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_length: default_max_queue_length(),
            minutes_per_person: default_minutes_per_person(),
            zone_minutes: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_history_len")]
    pub history_len: usize,
    /// Cap on the growth-rate term; unbounded when absent
    #[serde(default)]
    pub growth_clamp: Option<f64>,
}

fn default_history_len() -> usize {
    10
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { history_len: default_history_len(), growth_clamp: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_critical_count")]
    pub critical_count: u32,
    #[serde(default = "default_high_count")]
    pub high_count: u32,
    #[serde(default = "default_bottleneck_pressure")]
    pub bottleneck_pressure: f64,
    #[serde(default = "default_imbalance_spread")]
    pub imbalance_spread: f64,
}

fn default_critical_count() -> u32 {
    40
}

fn default_high_count() -> u32 {
    25
}

fn default_bottleneck_pressure() -> f64 {
    40.0
}

fn default_imbalance_spread() -> f64 {
    25.0
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            critical_count: default_critical_count(),
            high_count: default_high_count(),
            bottleneck_pressure: default_bottleneck_pressure(),
            imbalance_spread: default_imbalance_spread(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Boxes below this confidence are ignored
    #[serde(default)]
    pub min_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self { min_confidence: 0.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    10
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

/// Zone layout seeded at startup for one facility
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityConfig {
    pub id: u64,
    #[serde(default)]
    pub zones: ZoneLayout,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub facilities: Vec<FacilityConfig>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    bind_address: String,
    port: u16,
    max_queue_length: usize,
    minutes_per_person: u32,
    zone_minutes: HashMap<String, u32>,
    history_len: usize,
    growth_clamp: Option<f64>,
    alerts: AlertSettings,
    min_confidence: f32,
    metrics_interval_secs: u64,
    facilities: Vec<(FacilityId, ZoneLayout)>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let alerts = AlertSettings {
            critical_count: toml_config.alerts.critical_count,
            high_count: toml_config.alerts.high_count,
            bottleneck_pressure: toml_config.alerts.bottleneck_pressure,
            imbalance_spread: toml_config.alerts.imbalance_spread,
        };

        Self {
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            max_queue_length: toml_config.queue.max_queue_length,
            minutes_per_person: toml_config.queue.minutes_per_person,
            zone_minutes: toml_config.queue.zone_minutes,
            history_len: toml_config.analysis.history_len,
            growth_clamp: toml_config.analysis.growth_clamp,
            alerts,
            min_confidence: toml_config.detector.min_confidence,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            facilities: toml_config
                .facilities
                .into_iter()
                .map(|f| (FacilityId(f.id), f.zones))
                .collect(),
            config_file,
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content).context("Failed to parse config")?;
        Ok(Self::from_toml(toml_config, "inline".to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration from a path, falling back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Settings for every pipeline stage
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            queue: QueueSettings {
                max_queue_length: self.max_queue_length,
                minutes_per_person: self.minutes_per_person,
                zone_minutes: self.zone_minutes.clone(),
            },
            analysis: AnalysisSettings {
                history_len: self.history_len,
                growth_clamp: self.growth_clamp,
            },
            alerts: self.alerts.clone(),
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn max_queue_length(&self) -> usize {
        self.max_queue_length
    }

    pub fn minutes_per_person(&self) -> u32 {
        self.minutes_per_person
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn growth_clamp(&self) -> Option<f64> {
        self.growth_clamp
    }

    pub fn alerts(&self) -> &AlertSettings {
        &self.alerts
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn facilities(&self) -> &[(FacilityId, ZoneLayout)] {
        &self.facilities
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the queue cap
    #[cfg(test)]
    pub fn with_max_queue_length(mut self, len: usize) -> Self {
        self.max_queue_length = len;
        self
    }
}
